//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Ledger accounts, keyed by `account_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Payment records, keyed by `record_id` (ULID).
    pub const PAYMENT_RECORDS: &str = "payment_records";

    /// Index: records by account, keyed by `account_id || record_id`.
    /// Value is empty (index only).
    pub const RECORDS_BY_ACCOUNT: &str = "records_by_account";

    /// Index: success record per payment, `payment_id` -> `record_id`.
    pub const SUCCESS_BY_PAYMENT: &str = "success_by_payment";

    /// Index: success record per order, `order_id` -> `record_id`.
    pub const SUCCESS_BY_ORDER: &str = "success_by_order";

    /// Settlement claims, keyed by `payment_id`.
    pub const CLAIMS: &str = "claims";

    /// Claimed orders, `order_id` -> `payment_id`.
    pub const CLAIMED_ORDERS: &str = "claimed_orders";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::PAYMENT_RECORDS,
        cf::RECORDS_BY_ACCOUNT,
        cf::SUCCESS_BY_PAYMENT,
        cf::SUCCESS_BY_ORDER,
        cf::CLAIMS,
        cf::CLAIMED_ORDERS,
    ]
}
