//! Core types and utilities for infograph credits.
//!
//! This crate provides the foundational types shared by the store, the HTTP
//! service and the client SDK:
//!
//! - **Identifiers**: `AccountId`, `PaymentRecordId`, `OrderId`, `PaymentId`
//! - **Accounts**: `Account`
//! - **Payments**: `PaymentRecord`, `PaymentStatus`, `PaymentClaim`
//! - **Pricing**: `PriceTable`, `Price`, `Currency`, `Product`
//! - **Entitlements**: `evaluate`, `EntitlementInput`, `Entitlement`, `ExportBucket`
//!
//! # Credit Unit
//!
//! **1 credit = 1 paid infographic export**
//!
//! - A `proPack` purchase grants 10 credits, a `business` purchase 50
//! - Every paid export debits exactly 1 credit
//! - Balances are stored as `i64` and never go below zero

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod entitlement;
pub mod error;
pub mod ids;
pub mod payment;
pub mod pricing;

pub use account::Account;
pub use entitlement::{
    evaluate, Entitlement, EntitlementInput, EntitlementState, ExportBucket,
    ANONYMOUS_FREE_EXPORTS,
};
pub use error::{BillingError, Result};
pub use ids::{AccountId, IdError, OrderId, PaymentId, PaymentRecordId};
pub use payment::{PaymentClaim, PaymentRecord, PaymentStatus};
pub use pricing::{Currency, Price, PriceTable, Product};
