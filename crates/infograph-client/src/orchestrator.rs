//! Export orchestration.
//!
//! The entitlement evaluator is consulted first so that no render is wasted,
//! but the service-side debit is the only gate that counts. For a paid export
//! the credit is spent before the renderer runs, and local counters move only
//! after the export has actually been produced.

use std::sync::Arc;

use infograph_core::{evaluate, EntitlementInput, EntitlementState, ExportBucket};

use crate::client::InfographClient;
use crate::collaborators::{
    CaptionGenerator, CollaboratorError, ContentExtractor, ImageRenderer, Infographic, Session,
    SessionProvider, Summarizer,
};
use crate::error::ClientError;

/// Errors that abort an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// An external collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// The infograph service failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// How an export attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The image was produced.
    Rendered {
        /// PNG bytes.
        image: Vec<u8>,
        /// What paid for it.
        bucket: ExportBucket,
        /// Ledger balance after a paid export.
        credits_remaining: Option<i64>,
    },
    /// The user must buy credits first.
    PurchaseRequired {
        /// Balance at the time of the refusal.
        credits: i64,
    },
    /// The anonymous allowance is spent; the user must sign in.
    SignInRequired,
}

/// Turns a blog URL into renderable content.
pub struct InfographicPipeline {
    extractor: Arc<dyn ContentExtractor>,
    summarizer: Arc<dyn Summarizer>,
    captions: Arc<dyn CaptionGenerator>,
}

impl InfographicPipeline {
    /// Assemble a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn ContentExtractor>,
        summarizer: Arc<dyn Summarizer>,
        captions: Arc<dyn CaptionGenerator>,
    ) -> Self {
        Self {
            extractor,
            summarizer,
            captions,
        }
    }

    /// Extract, summarize and caption `url`.
    ///
    /// # Errors
    ///
    /// Returns the first collaborator failure.
    pub async fn build(&self, url: &str) -> Result<Infographic, CollaboratorError> {
        let text = self.extractor.extract_content(url).await?;
        tracing::debug!(url, chars = text.len(), "Content extracted");

        let summary = self.summarizer.summarize(&text).await?;
        let captions = self.captions.generate_captions(&summary).await?;

        Ok(Infographic {
            source_url: url.to_string(),
            summary,
            captions,
        })
    }
}

/// Sequences entitlement, debit, render and counter updates for one user.
pub struct ExportOrchestrator {
    client: InfographClient,
    session: Arc<dyn SessionProvider>,
    renderer: Arc<dyn ImageRenderer>,
    state: EntitlementState,
}

impl ExportOrchestrator {
    /// Create an orchestrator starting from saved session counters.
    #[must_use]
    pub fn new(
        client: InfographClient,
        session: Arc<dyn SessionProvider>,
        renderer: Arc<dyn ImageRenderer>,
        state: EntitlementState,
    ) -> Self {
        Self {
            client,
            session,
            renderer,
            state,
        }
    }

    /// Current session counters, for persisting between visits.
    #[must_use]
    pub fn state(&self) -> EntitlementState {
        self.state
    }

    /// Export `infographic` if the user is entitled to.
    ///
    /// # Errors
    ///
    /// Returns an error if the session, the service or the renderer fails.
    /// Counters are unchanged in every error case.
    pub async fn export(&mut self, infographic: &Infographic) -> Result<ExportOutcome, ExportError> {
        match self.session.current_user().await? {
            None => self.export_anonymous(infographic).await,
            Some(session) => self.export_signed_in(&session, infographic).await,
        }
    }

    async fn export_anonymous(&mut self, infographic: &Infographic) -> Result<ExportOutcome, ExportError> {
        let entitlement = evaluate(&EntitlementInput::from_state(&self.state, false, 0));
        if !entitlement.allowed {
            return Ok(ExportOutcome::SignInRequired);
        }

        let image = self.renderer.render_image(infographic).await?;
        self.state.record_export(ExportBucket::AnonymousFree);
        tracing::info!(
            anonymous_download_count = self.state.anonymous_download_count,
            "Anonymous export completed"
        );

        Ok(ExportOutcome::Rendered {
            image,
            bucket: ExportBucket::AnonymousFree,
            credits_remaining: None,
        })
    }

    async fn export_signed_in(
        &mut self,
        session: &Session,
        infographic: &Infographic,
    ) -> Result<ExportOutcome, ExportError> {
        let balance = match self.client.get_balance(&session.token).await {
            Ok(balance) => balance.credits,
            Err(ClientError::AccountNotFound) => self.client.create_account(&session.token).await?.credits,
            Err(e) => return Err(e.into()),
        };

        let entitlement = evaluate(&EntitlementInput::from_state(&self.state, true, balance));
        match (entitlement.allowed, entitlement.bucket) {
            (true, Some(ExportBucket::IntroductoryFree)) => {
                let image = self.renderer.render_image(infographic).await?;
                self.state.record_export(ExportBucket::IntroductoryFree);
                tracing::info!(account_id = %session.account_id, "Introductory export completed");

                Ok(ExportOutcome::Rendered {
                    image,
                    bucket: ExportBucket::IntroductoryFree,
                    credits_remaining: Some(balance),
                })
            }
            (true, Some(ExportBucket::PaidCredit)) => {
                let remaining = match self.client.debit_credit(&session.token, &session.account_id).await {
                    Ok(debit) => debit.credits_remaining,
                    Err(ClientError::InsufficientCredits { balance, .. }) => {
                        tracing::info!(
                            account_id = %session.account_id,
                            balance,
                            "Debit refused after optimistic entitlement"
                        );
                        return Ok(ExportOutcome::PurchaseRequired { credits: balance });
                    }
                    Err(e) => return Err(e.into()),
                };

                let image = self.renderer.render_image(infographic).await.map_err(|e| {
                    tracing::warn!(
                        account_id = %session.account_id,
                        error = %e,
                        "Render failed after debit"
                    );
                    e
                })?;
                tracing::info!(account_id = %session.account_id, remaining, "Paid export completed");

                Ok(ExportOutcome::Rendered {
                    image,
                    bucket: ExportBucket::PaidCredit,
                    credits_remaining: Some(remaining),
                })
            }
            _ => Ok(ExportOutcome::PurchaseRequired { credits: balance }),
        }
    }
}
