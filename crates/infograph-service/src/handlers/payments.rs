//! Payment verification and history handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use infograph_core::PaymentRecord;

use crate::auth::{AuthUser, OptionalAuthUser};
use crate::billing::{self, PaymentConfirmation};
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for payment history.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page size accepted.
const MAX_PAGE_SIZE: usize = 100;

/// Payment confirmation submitted after checkout.
///
/// Every field is optional at the wire level so that absent fields produce
/// `MISSING_DETAILS` instead of a generic parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyPaymentBody {
    /// Provider order id.
    pub order_id: Option<String>,
    /// Provider payment id.
    pub payment_id: Option<String>,
    /// Provider signature.
    pub signature: Option<String>,
    /// Account to credit.
    pub account_id: Option<String>,
}

/// Verification response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    /// Always `true`.
    pub success: bool,
    /// Whether this payment had already been credited.
    pub duplicate: bool,
    /// Credits granted by this call.
    pub credits_granted: i64,
    /// Balance after the call.
    pub total_credits: i64,
}

/// Verify a signed payment confirmation and credit the account once.
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(auth): OptionalAuthUser,
    payload: Result<Json<VerifyPaymentBody>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let Json(body) = payload?;

    let confirmation = PaymentConfirmation::parse(
        body.order_id.as_deref(),
        body.payment_id.as_deref(),
        body.signature.as_deref(),
        body.account_id.as_deref(),
    )?;

    let outcome = billing::verify_payment(&state, auth.as_ref(), confirmation).await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        duplicate: outcome.duplicate,
        credits_granted: outcome.credits_granted,
        total_credits: outcome.total_credits,
    }))
}

/// Pagination parameters.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Page size (default 20, max 100).
    pub limit: Option<usize>,
    /// Records to skip.
    pub offset: Option<usize>,
}

/// Payment record as shown to its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    /// Record ID.
    pub id: String,
    /// Provider order id.
    pub order_id: String,
    /// Provider payment id.
    pub payment_id: String,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// ISO currency code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Product.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Credits granted.
    pub credits_granted: i64,
    /// `success`, `signature_failed` or `replay_rejected`.
    pub status: String,
    /// Created timestamp (RFC 3339).
    pub created_at: String,
}

impl From<&PaymentRecord> for PaymentResponse {
    fn from(record: &PaymentRecord) -> Self {
        Self {
            id: record.id.to_string(),
            order_id: record.order_id.to_string(),
            payment_id: record.payment_id.to_string(),
            amount: record.amount,
            currency: record.currency.map(|c| c.code().to_string()),
            product: record.product.map(|p| p.as_str().to_string()),
            credits_granted: record.credits_granted,
            status: record.status.as_str().to_string(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Payment history response.
#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    /// Records, newest first.
    pub payments: Vec<PaymentResponse>,
}

/// List the caller's payment records, newest first.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PaymentsResponse>, ApiError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let records = state
        .store
        .list_payments_by_account(&auth.account_id, limit, offset)
        .await?;

    Ok(Json(PaymentsResponse {
        payments: records.iter().map(PaymentResponse::from).collect(),
    }))
}
