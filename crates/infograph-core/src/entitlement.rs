//! Advisory export entitlement.
//!
//! The evaluator answers "is this user likely allowed to export right now, and
//! which bucket would the export draw from?" before any rendering work is
//! done. It is pure and never authoritative: paid exports are always gated by
//! the server-side atomic debit.

use serde::{Deserialize, Serialize};

/// Number of exports an unauthenticated visitor gets for free.
pub const ANONYMOUS_FREE_EXPORTS: i64 = 1;

/// Where an export would be paid from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportBucket {
    /// The single free export before signing in.
    AnonymousFree,
    /// The one-time free export granted after signing in.
    IntroductoryFree,
    /// One paid credit from the ledger.
    PaidCredit,
}

/// Client-held session counters.
///
/// These are UX hints only. They are never trusted for a debit decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementState {
    /// Exports completed while unauthenticated.
    pub anonymous_download_count: i64,
    /// Whether the post-login free export has been consumed.
    pub has_used_introductory_free_export: bool,
}

impl EntitlementState {
    /// Record a completed export drawn from `bucket`.
    ///
    /// Paid exports are tracked by the ledger, so they leave the counters alone.
    pub fn record_export(&mut self, bucket: ExportBucket) {
        match bucket {
            ExportBucket::AnonymousFree => self.anonymous_download_count += 1,
            ExportBucket::IntroductoryFree => self.has_used_introductory_free_export = true,
            ExportBucket::PaidCredit => {}
        }
    }
}

/// Everything the evaluator looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementInput {
    /// Whether the caller holds a session.
    pub is_authenticated: bool,
    /// Whether the post-login free export has been consumed.
    pub has_used_introductory_free_export: bool,
    /// Ledger balance as last seen by the client (0 when unknown).
    pub paid_credits: i64,
    /// Exports completed while unauthenticated.
    pub anonymous_download_count: i64,
}

impl EntitlementInput {
    /// Combine session counters with the caller's auth state and balance.
    #[must_use]
    pub fn from_state(state: &EntitlementState, is_authenticated: bool, paid_credits: i64) -> Self {
        Self {
            is_authenticated,
            has_used_introductory_free_export: state.has_used_introductory_free_export,
            paid_credits,
            anonymous_download_count: state.anonymous_download_count,
        }
    }
}

/// The evaluator's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    /// Whether an export is expected to succeed.
    pub allowed: bool,
    /// Exports left before a purchase is needed.
    pub remaining: i64,
    /// Bucket the next export draws from, if allowed.
    pub bucket: Option<ExportBucket>,
}

/// Decide whether an export is permitted and which bucket it draws from.
///
/// Once signed in, the introductory export is spent before any paid credit,
/// so `remaining` counts it on top of the balance.
#[must_use]
pub fn evaluate(input: &EntitlementInput) -> Entitlement {
    let paid = input.paid_credits.max(0);

    if !input.is_authenticated {
        let remaining = (ANONYMOUS_FREE_EXPORTS - input.anonymous_download_count).max(0);
        let allowed = input.anonymous_download_count < ANONYMOUS_FREE_EXPORTS;
        return Entitlement {
            allowed,
            remaining,
            bucket: allowed.then_some(ExportBucket::AnonymousFree),
        };
    }

    if !input.has_used_introductory_free_export {
        return Entitlement {
            allowed: true,
            remaining: paid + 1,
            bucket: Some(ExportBucket::IntroductoryFree),
        };
    }

    Entitlement {
        allowed: paid > 0,
        remaining: paid,
        bucket: (paid > 0).then_some(ExportBucket::PaidCredit),
    }
}
