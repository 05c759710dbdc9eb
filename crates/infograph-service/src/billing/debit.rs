//! The authoritative credit debit.

use infograph_core::AccountId;
use infograph_store::StoreError;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Consume one credit from the caller's own account.
///
/// Returns the remaining balance. The store performs a single conditional
/// decrement, so concurrent debits can never spend the same credit twice.
pub async fn debit_credit(
    state: &AppState,
    caller: &AuthUser,
    account_id: &AccountId,
) -> Result<i64, ApiError> {
    if caller.account_id != *account_id {
        tracing::warn!(
            caller = %caller.account_id,
            account_id = %account_id,
            "Debit attempted on another account"
        );
        return Err(ApiError::Forbidden);
    }

    match state.store.debit_credit(account_id).await {
        Ok(remaining) => {
            tracing::info!(account_id = %account_id, remaining, "Credit debited");
            Ok(remaining)
        }
        Err(StoreError::InsufficientCredits { balance, required }) => {
            tracing::debug!(account_id = %account_id, balance, "Debit refused: no credits");
            Err(ApiError::InsufficientCredits { balance, required })
        }
        Err(e) => Err(e.into()),
    }
}
