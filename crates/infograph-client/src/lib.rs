//! Infograph Client SDK.
//!
//! This crate provides a client library for the infograph HTTP API, plus the
//! export orchestration that ties the entitlement evaluator, the credit debit
//! and the external renderer together.
//!
//! # Example
//!
//! ```no_run
//! use infograph_client::{CreateOrderRequest, InfographClient};
//! use infograph_core::{Currency, Product};
//!
//! # async fn example() -> Result<(), infograph_client::ClientError> {
//! let client = InfographClient::new("http://infograph.internal:8080")?;
//!
//! let order = client
//!     .create_order(
//!         Some("user-jwt"),
//!         &CreateOrderRequest {
//!             account_id: None,
//!             currency: Currency::Usd,
//!             product: Product::ProPack,
//!         },
//!     )
//!     .await?;
//!
//! println!("Pay {} for {} credits", order.amount, order.credits);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
pub mod collaborators;
mod error;
pub mod orchestrator;
mod types;

pub use client::{ClientOptions, InfographClient};
pub use collaborators::{
    CaptionGenerator, Captions, CollaboratorError, ContentExtractor, ImageRenderer, Infographic,
    Session, SessionProvider, Summarizer,
};
pub use error::ClientError;
pub use orchestrator::{ExportError, ExportOrchestrator, ExportOutcome, InfographicPipeline};
pub use types::*;
