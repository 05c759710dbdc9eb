//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, health, orders, payments};
use crate::state::AppState;

/// Maximum concurrent requests for payment endpoints.
/// Each of these may hold a provider call open for several seconds.
const PAYMENT_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/pricing` - Price table
/// - `GET /v1/orders/config` - Whether checkout is available
///
/// ## Accounts (JWT auth)
/// - `POST /v1/accounts` - Create/register account
/// - `GET /v1/accounts/me` - Get current user's account
///
/// ## Credits (JWT auth)
/// - `GET /v1/credits/balance` - Get current balance
/// - `POST /v1/credits/debit` - Spend one credit
///
/// ## Payments (optional JWT auth, rate-limited)
/// - `POST /v1/orders` - Create a provider order
/// - `POST /v1/payments/verify` - Verify a payment and grant credits
/// - `GET /v1/payments` - Caller's payment history (JWT required)
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let payment_routes = Router::new()
        .route("/orders", post(orders::create_order))
        .route("/payments/verify", post(payments::verify_payment))
        .layer(ConcurrencyLimitLayer::new(PAYMENT_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/me", get(accounts::get_account))
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/debit", post(credits::debit))
        // Payments
        .route("/payments", get(payments::list_payments))
        .route("/orders/config", get(orders::order_config))
        .route("/pricing", get(orders::pricing))
        .merge(payment_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
