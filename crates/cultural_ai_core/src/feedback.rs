//! crates/cultural_ai_core/src/feedback.rs
//!
//! Relays user feedback about an analysis result to a sink, after validation
//! and anonymization.

use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{FeedbackKind, FeedbackReceipt, FeedbackSubmission, RelayedFeedback};
use crate::ports::{FeedbackSink, PortError, PortResult};
use crate::retention::anonymize;

pub const ANONYMOUS_USER: &str = "anonymous";

const THANK_YOU: &str =
    "Thank you for your feedback. We appreciate your help in improving our AI.";

pub struct FeedbackRelay {
    sink: Arc<dyn FeedbackSink>,
}

impl FeedbackRelay {
    pub fn new(sink: Arc<dyn FeedbackSink>) -> Self {
        Self { sink }
    }

    /// Validates, anonymizes and forwards one submission.
    ///
    /// Validation problems are returned as `PortError::Validation` without touching
    /// the sink; sink failures come back as an unsuccessful receipt.
    pub async fn submit(&self, submission: FeedbackSubmission) -> PortResult<FeedbackReceipt> {
        if submission.kind.trim().is_empty() || submission.text.trim().is_empty() {
            return Err(PortError::Validation(
                "Feedback type and text are required".to_string(),
            ));
        }
        let kind = FeedbackKind::parse(&submission.kind).ok_or_else(|| {
            PortError::Validation(format!("Unknown feedback type '{}'", submission.kind.trim()))
        })?;

        let user_id = submission
            .user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        let feedback = RelayedFeedback {
            id: Uuid::new_v4(),
            analysis_id: submission.analysis_id,
            culture_id: submission.culture_id,
            kind,
            text: anonymize(&submission.text),
            submitted_at: submission.submitted_at,
            user_id,
        };

        match self.sink.relay(&feedback).await {
            Ok(()) => {
                info!(feedback_id = %feedback.id, kind = kind.as_str(), "Feedback relayed");
                Ok(FeedbackReceipt {
                    success: true,
                    message: Some(THANK_YOU.to_string()),
                })
            }
            Err(e) => {
                error!(feedback_id = %feedback.id, "Feedback submission error: {}", e);
                Ok(FeedbackReceipt {
                    success: false,
                    message: Some("Failed to process feedback".to_string()),
                })
            }
        }
    }
}
