//! Payment audit records and settlement claims.
//!
//! Every verification attempt that reaches a verdict leaves a `PaymentRecord`.
//! Records are append-only: they are never mutated and never deleted.
//!
//! A `PaymentClaim` is the exactly-once gate. It is written in the same atomic
//! unit as the ledger increment, so a payment can only ever be credited once
//! even when the audit record that normally follows is lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{AccountId, Currency, OrderId, PaymentId, PaymentRecordId, Product};

/// Outcome recorded for a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Signature valid and credits granted.
    Success,
    /// Signature did not match the provider secret.
    SignatureFailed,
    /// The order had already been settled by another payment.
    ReplayRejected,
}

impl PaymentStatus {
    /// Return the status as it is persisted.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SignatureFailed => "signature_failed",
            Self::ReplayRejected => "replay_rejected",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "signature_failed" => Ok(Self::SignatureFailed),
            "replay_rejected" => Ok(Self::ReplayRejected),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// An audit record of one verification verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique record ID (ULID, time-ordered).
    pub id: PaymentRecordId,

    /// Provider order identifier.
    pub order_id: OrderId,

    /// Provider payment identifier.
    pub payment_id: PaymentId,

    /// Account the attempt was made for, when one could be resolved.
    pub account_id: Option<AccountId>,

    /// Amount in the smallest currency unit (0 when unknown).
    pub amount: i64,

    /// Currency of the order, when known.
    pub currency: Option<Currency>,

    /// Product purchased, when known.
    pub product: Option<Product>,

    /// Credits granted by this attempt (0 unless `status` is `Success`).
    pub credits_granted: i64,

    /// Verdict.
    pub status: PaymentStatus,

    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Record a successful, credited payment.
    #[must_use]
    pub fn success(claim: &PaymentClaim, amount: i64, currency: Currency, product: Product) -> Self {
        Self {
            id: PaymentRecordId::generate(),
            order_id: claim.order_id.clone(),
            payment_id: claim.payment_id.clone(),
            account_id: Some(claim.account_id),
            amount,
            currency: Some(currency),
            product: Some(product),
            credits_granted: claim.credits,
            status: PaymentStatus::Success,
            created_at: Utc::now(),
        }
    }

    /// Record a signature mismatch. No credits are granted.
    #[must_use]
    pub fn signature_failed(
        order_id: OrderId,
        payment_id: PaymentId,
        account_id: Option<AccountId>,
    ) -> Self {
        Self::rejected(order_id, payment_id, account_id, PaymentStatus::SignatureFailed)
    }

    /// Record an attempt to settle an already-settled order with a new payment.
    #[must_use]
    pub fn replay_rejected(
        order_id: OrderId,
        payment_id: PaymentId,
        account_id: Option<AccountId>,
    ) -> Self {
        Self::rejected(order_id, payment_id, account_id, PaymentStatus::ReplayRejected)
    }

    fn rejected(
        order_id: OrderId,
        payment_id: PaymentId,
        account_id: Option<AccountId>,
        status: PaymentStatus,
    ) -> Self {
        Self {
            id: PaymentRecordId::generate(),
            order_id,
            payment_id,
            account_id,
            amount: 0,
            currency: None,
            product: None,
            credits_granted: 0,
            status,
            created_at: Utc::now(),
        }
    }

    /// Check if this record settled its order.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PaymentStatus::Success
    }
}

/// The atomic record that a payment/order pair has been credited.
///
/// Both `payment_id` and `order_id` are unique across all claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentClaim {
    /// Provider payment identifier.
    pub payment_id: PaymentId,

    /// Provider order identifier.
    pub order_id: OrderId,

    /// Account that received the credits.
    pub account_id: AccountId,

    /// Credits granted.
    pub credits: i64,

    /// When the claim was made.
    pub claimed_at: DateTime<Utc>,
}

impl PaymentClaim {
    /// Create a claim stamped with the current time.
    #[must_use]
    pub fn new(order_id: OrderId, payment_id: PaymentId, account_id: AccountId, credits: i64) -> Self {
        Self {
            payment_id,
            order_id,
            account_id,
            credits,
            claimed_at: Utc::now(),
        }
    }
}
