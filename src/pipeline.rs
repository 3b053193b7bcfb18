//! Lab finder pipeline
//!
//! One submission runs prompt building, the model exchange, extraction and
//! decoding in order against the caller's [`ChatSession`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument};

use crate::chat::{ChatModel, ChatSession};
use crate::models::Variant;
use crate::prompt::build_prompt;
use crate::render::{RenderOutcome, render_reply};

/// Finds labs for a location with a chat model
#[derive(Clone)]
pub struct LabFinder {
    model: Arc<dyn ChatModel>,
    variant: Variant,
}

impl LabFinder {
    pub fn new(model: Arc<dyn ChatModel>, variant: Variant) -> Self {
        Self { model, variant }
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Run the full pipeline for one location.
    ///
    /// Model failures are reported as [`RenderOutcome::ServiceUnavailable`]
    /// and never retried here.
    #[instrument(skip(self, session), fields(variant = ?self.variant))]
    pub async fn find(&self, session: &mut ChatSession, location: &str) -> RenderOutcome {
        let start_time = Instant::now();
        let prompt = build_prompt(self.variant, location);

        let reply = match session.send_message(self.model.as_ref(), &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Model call failed: {}", e);
                return RenderOutcome::ServiceUnavailable {
                    message: e.user_message(),
                };
            }
        };

        let outcome = render_reply(&reply, self.variant);
        match &outcome {
            RenderOutcome::Labs(report) => info!(
                labs = report.labs.len(),
                skipped = report.skipped,
                "Lab search finished in {:.3}s",
                start_time.elapsed().as_secs_f64()
            ),
            other => info!(
                outcome = other.error_message().unwrap_or_default(),
                "Lab search produced no labs"
            ),
        }
        outcome
    }
}
