//! Error types for infograph core.

use crate::ids::IdError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur when interpreting billing input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Currency outside the supported set.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Product outside the catalog.
    #[error("unknown product: {0}")]
    UnknownProduct(String),

    /// The price table has no entry for this pair.
    #[error("no price for {product} in {currency}")]
    PriceUnavailable {
        /// The requested currency.
        currency: String,
        /// The requested product.
        product: String,
    },

    /// Invalid amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
