//! Error types for infograph storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Insufficient credits for a debit.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// A success record for this payment already exists.
    #[error("payment already recorded: {payment_id}")]
    DuplicatePayment {
        /// The payment that was recorded twice.
        payment_id: String,
    },

    /// A success record for this order already exists.
    #[error("order already settled: {order_id}")]
    OrderAlreadySettled {
        /// The order that was settled twice.
        order_id: String,
    },
}

impl StoreError {
    /// Account lookup miss.
    #[must_use]
    pub fn account_not_found(id: &infograph_core::AccountId) -> Self {
        Self::NotFound {
            entity: "account",
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(format!("migration failed: {err}"))
    }
}
