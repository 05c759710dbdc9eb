//! API error types and responses.
//!
//! Every failure maps onto a closed set of machine-readable codes. The body is
//! always `{ "success": false, "error": <message>, "code": <CODE> }`, plus
//! optional `details`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use infograph_core::BillingError;
use infograph_store::StoreError;

const SUPPORT_HINT: &str = "please contact support";

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed or expired bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// Valid token, but for a different account.
    #[error("forbidden")]
    Forbidden,

    /// Malformed input (unknown currency or product, bad body).
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Required payment fields absent.
    #[error("missing payment details: {0}")]
    MissingDetails(String),

    /// The account does not exist.
    #[error("account not found")]
    AccountNotFound,

    /// Balance is zero.
    #[error("Insufficient credits")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Verification requested for an account other than the caller's.
    #[error("user mismatch")]
    UserMismatch,

    /// Signature did not match `order_id|payment_id`.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// The order was already settled by a different payment.
    #[error("replay attack")]
    ReplayAttack,

    /// The payment was already settled for another account.
    #[error("payment already verified")]
    AlreadyVerified,

    /// The account to credit does not exist.
    #[error("profile not found")]
    ProfileNotFound,

    /// The account to credit could not be loaded.
    #[error("profile error: {0}")]
    Profile(String),

    /// The ledger update failed.
    #[error("credit update failed: {0}")]
    CreditUpdate(String),

    /// Payment provider unreachable or rejected the call.
    #[error("payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Payment provider credentials missing.
    #[error("payment provider not configured")]
    Misconfigured,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The machine-readable code sent to clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::BadRequest(_) => "INVALID_REQUEST",
            Self::MissingDetails(_) => "MISSING_DETAILS",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::UserMismatch => "USER_MISMATCH",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::ReplayAttack => "REPLAY_ATTACK",
            Self::AlreadyVerified => "ALREADY_VERIFIED",
            Self::ProfileNotFound | Self::Profile(_) => "PROFILE_ERROR",
            Self::CreditUpdate(_) => "CREDIT_UPDATE_ERROR",
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::Misconfigured => "MISCONFIGURED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::UserMismatch => StatusCode::FORBIDDEN,
            Self::BadRequest(_)
            | Self::MissingDetails(_)
            | Self::InsufficientCredits { .. }
            | Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::AccountNotFound | Self::ProfileNotFound | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::ReplayAttack | Self::AlreadyVerified | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Profile(_) | Self::CreditUpdate(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Misconfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (message, details) = match &self {
            Self::Unauthorized => ("Authentication required".to_string(), None),
            Self::Forbidden => ("Not allowed to act on this account".to_string(), None),
            Self::BadRequest(msg) | Self::MissingDetails(msg) => (msg.clone(), None),
            Self::AccountNotFound => ("Account not found".to_string(), None),
            Self::InsufficientCredits { balance, required } => (
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::UserMismatch => (
                format!("This payment cannot be applied to your account, {SUPPORT_HINT}"),
                None,
            ),
            Self::InvalidSignature => ("Payment signature is invalid".to_string(), None),
            Self::ReplayAttack => (
                format!("This payment could not be verified, {SUPPORT_HINT}"),
                None,
            ),
            Self::AlreadyVerified => ("Payment has already been verified".to_string(), None),
            Self::ProfileNotFound => ("Account to credit was not found".to_string(), None),
            Self::Misconfigured => ("Payments are not available right now".to_string(), None),
            Self::ProviderUnavailable(msg) => {
                tracing::warn!(error = %msg, "Payment provider unavailable");
                ("Payment provider is unavailable, try again".to_string(), None)
            }
            Self::NotFound(msg) | Self::Conflict(msg) => (msg.clone(), None),
            Self::Profile(msg) | Self::CreditUpdate(msg) | Self::Internal(msg) => {
                tracing::error!(error = %msg, code = self.code(), "Internal server error");
                ("An internal error occurred".to_string(), None)
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                entity: "account", ..
            } => Self::AccountNotFound,
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            StoreError::DuplicatePayment { .. } => Self::AlreadyVerified,
            StoreError::OrderAlreadySettled { .. } => Self::ReplayAttack,
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self::BadRequest(err.to_string())
    }
}
