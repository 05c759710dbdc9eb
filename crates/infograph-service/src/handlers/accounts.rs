//! Account handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use infograph_core::Account;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Account ID.
    pub account_id: String,
    /// Current credit balance.
    pub credits: i64,
    /// Created timestamp (RFC 3339).
    pub created_at: String,
    /// Last balance change (RFC 3339).
    pub updated_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id.to_string(),
            credits: account.credits,
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

/// Register the caller's account, or return it if it already exists.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.store.create_account(&auth.account_id).await?;

    tracing::info!(
        account_id = %account.id,
        credits = account.credits,
        "Account registered"
    );

    Ok(Json(AccountResponse::from(&account)))
}

/// Get the caller's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    Ok(Json(AccountResponse::from(&account)))
}
