//! Storage layer for infograph credits.
//!
//! This crate provides the authoritative ledger (per-account credit balances)
//! and the payment record store (audit trail plus exactly-once claims).
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`, the production backend
//! - `RocksStore`: embedded `RocksDB` with CBOR values (feature `rocksdb-backend`)
//! - [`MemoryStore`]: in-process maps for tests and local development
//!
//! # Atomicity
//!
//! Every backend implements the two credit-affecting operations as single
//! atomic units:
//!
//! - [`Store::debit_credit`] is a conditional decrement gated on `credits > 0`
//! - [`Store::settle_payment`] inserts a [`PaymentClaim`] and increments the
//!   balance together, so a payment or order can be credited at most once
//!
//! # Example
//!
//! ```no_run
//! use infograph_core::AccountId;
//! use infograph_store::{MemoryStore, Store};
//!
//! # async fn example() -> infograph_store::Result<()> {
//! let store = MemoryStore::new();
//! let account_id = AccountId::generate();
//!
//! store.create_account(&account_id).await?;
//! let account = store.get_account(&account_id).await?;
//! assert_eq!(account.map(|a| a.credits), Some(0));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use infograph_core::{Account, AccountId, OrderId, PaymentClaim, PaymentId, PaymentRecord};

/// Outcome of an attempt to settle a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The claim was recorded and the account credited.
    Credited {
        /// Balance after the credit.
        balance: i64,
    },

    /// This payment had already been claimed. Nothing changed.
    PaymentAlreadySettled {
        /// Account that received the original credit.
        account_id: AccountId,
    },

    /// The order had already been claimed by a different payment. Nothing changed.
    OrderAlreadySettled {
        /// Payment that settled the order.
        payment_id: PaymentId,
    },
}

/// The storage trait defining all ledger and payment operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (PostgreSQL, `RocksDB`, in-memory for testing).
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Get the account, creating it with zero credits if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn create_account(&self, id: &AccountId) -> Result<Account>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Atomically consume one credit.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientCredits` if the balance is zero; nothing changes.
    async fn debit_credit(&self, id: &AccountId) -> Result<i64>;

    /// Atomically claim a payment and credit the account.
    ///
    /// The claim and the balance increment are applied together or not at
    /// all. A second claim for the same payment or order returns the matching
    /// `Settlement` variant without touching the ledger.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    async fn settle_payment(&self, claim: &PaymentClaim) -> Result<Settlement>;

    // =========================================================================
    // Payment Record Operations
    // =========================================================================

    /// Append a payment record.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicatePayment` if a success record for the payment exists.
    /// - `StoreError::OrderAlreadySettled` if a success record for the order exists.
    async fn insert_payment_record(&self, record: &PaymentRecord) -> Result<()>;

    /// Find the success record for a payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_successful_payment(&self, payment_id: &PaymentId)
        -> Result<Option<PaymentRecord>>;

    /// Find the success record that settled an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_successful_payment_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>>;

    /// List an account's payment records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_payments_by_account(
        &self,
        id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PaymentRecord>>;
}
