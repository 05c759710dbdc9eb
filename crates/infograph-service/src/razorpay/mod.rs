//! Razorpay integration for orders.
//!
//! Razorpay handles:
//! - Order creation before checkout
//! - Order lookup during payment verification
//!
//! Payment confirmations are verified locally (see [`crate::crypto`]); no
//! webhook is involved.

pub mod client;
pub mod types;

pub use client::{RazorpayClient, RazorpayError};
pub use types::{CreateOrderRequest, Order, OrderNotes};
