//! Request and response types for the infograph client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use infograph_core::{AccountId, Currency, Price, Product};

/// Registered account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Account ID.
    pub account_id: AccountId,
    /// Current credit balance.
    pub credits: i64,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last balance change.
    pub updated_at: DateTime<Utc>,
}

/// Balance response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    /// Account ID.
    pub account_id: AccountId,
    /// Current credit balance.
    pub credits: i64,
}

/// Debit request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitRequest {
    /// Account to debit; must match the bearer token.
    pub account_id: AccountId,
}

/// Debit response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitResponse {
    /// Always `true`.
    pub success: bool,
    /// Balance after the debit.
    pub credits_remaining: i64,
}

/// Order creation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Account to credit once paid (optional when signed in).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    /// Checkout currency.
    pub currency: Currency,
    /// Credit pack.
    pub product: Product,
}

/// Order creation response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// Provider order id.
    pub order_id: String,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// Checkout currency.
    pub currency: Currency,
    /// Credit pack.
    pub product: Product,
    /// Credits granted once verified.
    pub credits: i64,
    /// Key for the provider checkout widget.
    pub provider_public_key: String,
}

/// Provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfigResponse {
    /// Whether checkout is available.
    pub configured: bool,
    /// Key for the provider checkout widget.
    #[serde(default)]
    pub provider_public_key: Option<String>,
}

/// Price table.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingResponse {
    /// Every price on offer.
    pub prices: Vec<Price>,
}

/// Signed confirmation returned by the provider checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// Provider order id.
    pub order_id: String,
    /// Provider payment id.
    pub payment_id: String,
    /// Provider signature.
    pub signature: String,
    /// Account to credit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
}

/// Verification response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    /// Always `true`.
    pub success: bool,
    /// The payment had already been credited.
    pub duplicate: bool,
    /// Credits granted by this call.
    pub credits_granted: i64,
    /// Balance after the call.
    pub total_credits: i64,
}

/// Error body returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code.
    pub code: String,
    /// Additional details.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
