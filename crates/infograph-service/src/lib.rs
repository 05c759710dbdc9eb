//! Infograph HTTP API Service.
//!
//! This crate provides the HTTP API behind the infographic exporter:
//!
//! - Account registration and lookup
//! - Credit balance and single-credit debits
//! - Razorpay order creation
//! - Payment verification with exactly-once crediting
//!
//! # Authentication
//!
//! End-user requests carry an HS256 JWT from the identity provider. The `sub`
//! claim is the account ID. Order creation and payment verification also
//! accept anonymous callers that name an account explicitly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum requires async handlers

pub mod auth;
pub mod billing;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod razorpay;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use razorpay::{RazorpayClient, RazorpayError};
pub use routes::create_router;
pub use state::AppState;
