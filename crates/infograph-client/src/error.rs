//! Client error types.

/// Errors that can occur when using the infograph client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Machine-readable error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The account has no credits left.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// The caller's account is not registered.
    #[error("account not found")]
    AccountNotFound,

    /// The bearer token was missing or rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Whether the same request may succeed if sent again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, code, .. } => *status >= 500 || code == "PROVIDER_UNAVAILABLE",
            _ => false,
        }
    }

    /// The server's error code, when there is one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::InsufficientCredits { .. } => Some("INSUFFICIENT_CREDITS"),
            Self::AccountNotFound => Some("ACCOUNT_NOT_FOUND"),
            Self::Unauthorized => Some("UNAUTHORIZED"),
            _ => None,
        }
    }
}
