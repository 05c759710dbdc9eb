//! Account types for infograph.
//!
//! An account is the ledger row: one integer credit balance per authenticated
//! user. It is created on first sign-in and mutated only by a debit (-1) or a
//! verified purchase (+N).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// A credit ledger account for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account ID (the identity provider's subject).
    pub id: AccountId,

    /// Current credit balance. Never negative.
    pub credits: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero credits.
    #[must_use]
    pub fn new(id: AccountId) -> Self {
        let now = Utc::now();
        Self {
            id,
            credits: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account can pay for one export.
    #[must_use]
    pub fn can_debit(&self) -> bool {
        self.credits > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_has_zero_credits() {
        let id = AccountId::generate();
        let account = Account::new(id);
        assert_eq!(account.id, id);
        assert_eq!(account.credits, 0);
        assert_eq!(account.created_at, account.updated_at);
        assert!(!account.can_debit());
    }

    #[test]
    fn account_with_credits_can_debit() {
        let mut account = Account::new(AccountId::generate());
        account.credits = 1;
        assert!(account.can_debit());
    }
}
