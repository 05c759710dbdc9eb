//! Order creation, provider configuration and pricing handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use infograph_core::{AccountId, Currency, Price, Product};

use crate::auth::OptionalAuthUser;
use crate::billing::{self, OrderRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// Create order request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    /// Account to credit later (optional).
    #[serde(default)]
    pub account_id: Option<String>,
    /// ISO currency code, case-insensitive.
    pub currency: String,
    /// `proPack` or `business`.
    pub product: String,
}

/// Create order response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// Provider order id.
    pub order_id: String,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// ISO currency code.
    pub currency: Currency,
    /// Product.
    pub product: Product,
    /// Credits granted once paid.
    pub credits: i64,
    /// Public key for the checkout widget.
    pub provider_public_key: String,
}

/// Open a provider order for a credit pack.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(auth): OptionalAuthUser,
    payload: Result<Json<CreateOrderBody>, JsonRejection>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let Json(body) = payload?;

    let request = OrderRequest {
        account_id: body
            .account_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<AccountId>)
            .transpose()
            .map_err(|_| ApiError::BadRequest("accountId is malformed".into()))?,
        currency: body.currency.parse()?,
        product: body.product.parse()?,
    };

    let order = billing::create_order(&state, auth.as_ref(), request).await?;

    Ok(Json(CreateOrderResponse {
        order_id: order.order_id.to_string(),
        amount: order.amount,
        currency: order.currency,
        product: order.product,
        credits: order.credits,
        provider_public_key: order.provider_public_key,
    }))
}

/// Provider configuration response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfigResponse {
    /// Whether Razorpay credentials are present.
    pub configured: bool,
    /// Public key id, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_public_key: Option<String>,
}

/// Report whether checkout is available. Never exposes the secret.
pub async fn order_config(State(state): State<Arc<AppState>>) -> Json<OrderConfigResponse> {
    Json(OrderConfigResponse {
        configured: state.has_razorpay(),
        provider_public_key: state.razorpay.as_ref().map(|r| r.key_id().to_string()),
    })
}

/// Pricing response.
#[derive(Debug, Serialize)]
pub struct PricingResponse {
    /// Every price on offer.
    pub prices: Vec<Price>,
}

/// List the price table.
pub async fn pricing(State(state): State<Arc<AppState>>) -> Json<PricingResponse> {
    Json(PricingResponse {
        prices: state.config.pricing.prices().to_vec(),
    })
}
