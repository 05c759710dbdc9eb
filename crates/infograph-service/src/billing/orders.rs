//! Provider order creation.
//!
//! No credits move here. An order only becomes credits once it is paid and
//! the signed confirmation passes verification, so callers may retry freely.

use std::time::Duration;

use infograph_core::{AccountId, Currency, OrderId, Product};
use ulid::Ulid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::razorpay::{CreateOrderRequest, OrderNotes, RazorpayError};
use crate::state::AppState;

/// Attempts per order creation (first call plus one retry).
const ORDER_MAX_ATTEMPTS: u32 = 2;

/// Backoff before the first retry; doubles on each further attempt.
const ORDER_INITIAL_BACKOFF_MS: u64 = 250;

/// A validated order creation request.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Account named by the client, if any.
    pub account_id: Option<AccountId>,
    /// Checkout currency.
    pub currency: Currency,
    /// Credit pack.
    pub product: Product,
}

/// An order ready for checkout.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    /// Provider order id.
    pub order_id: OrderId,
    /// Amount in the smallest currency unit, from the price table.
    pub amount: i64,
    /// Checkout currency.
    pub currency: Currency,
    /// Credit pack.
    pub product: Product,
    /// Credits the order is worth once paid.
    pub credits: i64,
    /// Public key for the checkout widget.
    pub provider_public_key: String,
}

/// Open a provider order priced from the server-side table.
pub async fn create_order(
    state: &AppState,
    caller: Option<&AuthUser>,
    request: OrderRequest,
) -> Result<CreatedOrder, ApiError> {
    let account_id = match (caller, request.account_id) {
        (Some(caller), Some(requested)) if caller.account_id != requested => {
            tracing::warn!(
                caller = %caller.account_id,
                account_id = %requested,
                "Order requested for another account"
            );
            return Err(ApiError::Forbidden);
        }
        (caller, requested) => requested.or(caller.map(|c| c.account_id)),
    };

    let razorpay = state.razorpay.as_ref().ok_or(ApiError::Misconfigured)?;
    let price = state.config.pricing.price(request.currency, request.product)?;

    let order_request = CreateOrderRequest {
        amount: price.amount,
        currency: price.currency.code().to_string(),
        receipt: format!("rcpt_{}", Ulid::new()),
        notes: OrderNotes {
            account_id: account_id.map(|id| id.to_string()),
            product: Some(price.product.as_str().to_string()),
            credits: Some(price.credits.to_string()),
            currency: Some(price.currency.code().to_string()),
        },
    };

    let mut attempt = 0;
    let order = loop {
        attempt += 1;
        match razorpay.create_order(&order_request).await {
            Ok(order) => break order,
            Err(e) if e.is_transient() && attempt < ORDER_MAX_ATTEMPTS => {
                let backoff = ORDER_INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                tracing::warn!(
                    attempt,
                    backoff_ms = backoff,
                    error = %e,
                    "Razorpay order creation failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => return Err(provider_error(&e)),
        }
    };

    let order_id = order.id.parse::<OrderId>().map_err(|_| {
        ApiError::ProviderUnavailable(format!("provider returned malformed order id {:?}", order.id))
    })?;

    tracing::info!(
        order_id = %order_id,
        account_id = ?account_id.map(|id| id.to_string()),
        product = %price.product,
        currency = %price.currency,
        amount = price.amount,
        "Order created"
    );

    Ok(CreatedOrder {
        order_id,
        amount: price.amount,
        currency: price.currency,
        product: price.product,
        credits: price.credits,
        provider_public_key: razorpay.key_id().to_string(),
    })
}

/// Map a provider failure onto the closed error set.
pub(crate) fn provider_error(err: &RazorpayError) -> ApiError {
    ApiError::ProviderUnavailable(err.to_string())
}
