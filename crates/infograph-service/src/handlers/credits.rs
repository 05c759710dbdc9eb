//! Credit balance and debit handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use infograph_core::AccountId;

use crate::auth::AuthUser;
use crate::billing;
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    /// Account ID.
    pub account_id: String,
    /// Current credit balance.
    pub credits: i64,
}

/// Get the caller's balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    Ok(Json(BalanceResponse {
        account_id: account.id.to_string(),
        credits: account.credits,
    }))
}

/// Debit request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitRequest {
    /// Account to debit; must be the caller's.
    pub account_id: String,
}

/// Debit response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitResponse {
    /// Always `true`.
    pub success: bool,
    /// Balance after the debit.
    pub credits_remaining: i64,
}

/// Consume one credit for an export.
pub async fn debit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    payload: Result<Json<DebitRequest>, JsonRejection>,
) -> Result<Json<DebitResponse>, ApiError> {
    let Json(body) = payload?;
    let account_id: AccountId = body
        .account_id
        .parse()
        .map_err(|_| ApiError::BadRequest("accountId is malformed".into()))?;

    let credits_remaining = billing::debit_credit(&state, &auth, &account_id).await?;

    Ok(Json(DebitResponse {
        success: true,
        credits_remaining,
    }))
}
