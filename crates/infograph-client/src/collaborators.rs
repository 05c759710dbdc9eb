//! External collaborators the export flow depends on.
//!
//! Scraping, language-model calls, image rendering and session management live
//! outside this crate. Each is an async trait so callers can plug in real
//! services or fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use infograph_core::AccountId;

/// Errors reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator could not be reached or timed out. Safe to retry.
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        /// Which collaborator failed.
        collaborator: &'static str,
        /// Failure description.
        message: String,
    },

    /// The collaborator rejected its input.
    #[error("{collaborator} rejected input: {message}")]
    Rejected {
        /// Which collaborator failed.
        collaborator: &'static str,
        /// Failure description.
        message: String,
    },
}

/// Social captions for a finished infographic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captions {
    /// Short-form caption.
    pub twitter: String,
    /// Long-form caption.
    pub linkedin: String,
}

/// Content ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Infographic {
    /// The blog post it was built from.
    pub source_url: String,
    /// Summary shown on the image.
    pub summary: String,
    /// Captions to share alongside it.
    pub captions: Captions,
}

/// The signed-in user, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Account ID from the identity provider.
    pub account_id: AccountId,
    /// Bearer token for the infograph service.
    pub token: String,
}

/// Fetches a page and returns its readable text.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extract article text from `url`.
    async fn extract_content(&self, url: &str) -> Result<String, CollaboratorError>;
}

/// Condenses article text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text`.
    async fn summarize(&self, text: &str) -> Result<String, CollaboratorError>;
}

/// Writes social captions for a summary.
#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    /// Generate captions for `summary`.
    async fn generate_captions(&self, summary: &str) -> Result<Captions, CollaboratorError>;
}

/// Produces the exported image.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    /// Render `infographic` to PNG bytes.
    async fn render_image(&self, infographic: &Infographic) -> Result<Vec<u8>, CollaboratorError>;
}

/// Reports who is signed in.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current session, or `None` when anonymous.
    async fn current_user(&self) -> Result<Option<Session>, CollaboratorError>;
}
