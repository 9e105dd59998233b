//! crates/cultural_ai_core/src/gate.rs
//!
//! The analysis gate: consent check, optional prompt, analysis, privacy-safe logging.
//!
//! ```text
//! Start -> CheckConsent -> { NeedsPrompt | Proceed | Blocked } -> Analyze -> Log -> Return
//! ```
//!
//! The gate keeps no state between requests. Cancelling while the consent prompt
//! is open leaves consent untouched and never reaches the analyzer.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::consent::ConsentStore;
use crate::domain::{AnalysisRequest, ConsentKind, ConsentValue, FindingReport, PromptOutcome, RetentionTag};
use crate::ports::{ConsentPrompt, CulturalAnalyzer, DiagnosticLog, PortError, PortResult};
use crate::retention::{LogPayload, RetentionPolicy};

pub struct AnalysisGate {
    analyzer: Arc<dyn CulturalAnalyzer>,
    retention: RetentionPolicy,
    log: Arc<dyn DiagnosticLog>,
}

impl AnalysisGate {
    pub fn new(
        analyzer: Arc<dyn CulturalAnalyzer>,
        retention: RetentionPolicy,
        log: Arc<dyn DiagnosticLog>,
    ) -> Self {
        Self {
            analyzer,
            retention,
            log,
        }
    }

    pub async fn run(
        &self,
        consent: &ConsentStore,
        prompt: &dyn ConsentPrompt,
        request: AnalysisRequest,
        culture_name: &str,
    ) -> PortResult<FindingReport> {
        self.run_cancellable(consent, prompt, request, culture_name, CancellationToken::new())
            .await
    }

    pub async fn run_cancellable(
        &self,
        consent: &ConsentStore,
        prompt: &dyn ConsentPrompt,
        request: AnalysisRequest,
        culture_name: &str,
        cancel: CancellationToken,
    ) -> PortResult<FindingReport> {
        if let Some(field) = request.missing_field() {
            return Err(PortError::Validation(format!("{} is required", field)));
        }

        match consent.get(ConsentKind::TextAnalysis).await {
            ConsentValue::Granted => {}
            ConsentValue::Denied => {
                debug!(subject = consent.subject(), "Text analysis blocked: consent denied");
                return Err(PortError::ConsentDenied);
            }
            ConsentValue::Unset => self.ask_for_consent(consent, prompt, &cancel).await?,
        }

        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PortError::Cancelled),
            report = self.analyzer.analyze(&request, culture_name) => report,
        };

        let entry = self.retention.prepare_for_log(
            RetentionTag::AnalyzedText,
            LogPayload::from(&request)
                .with_field("issue_count", report.issues.len())
                .with_field("degraded", report.is_failure()),
        );
        self.log.record("Text analyzed", &entry);

        Ok(report)
    }

    async fn ask_for_consent(
        &self,
        consent: &ConsentStore,
        prompt: &dyn ConsentPrompt,
        cancel: &CancellationToken,
    ) -> PortResult<()> {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PortError::Cancelled),
            outcome = prompt.show_consent_prompt() => outcome?,
        };

        match outcome {
            PromptOutcome::Accepted { ai_improvement } => {
                consent.set(ConsentKind::TextAnalysis, true).await;
                consent.set(ConsentKind::AiImprovement, ai_improvement).await;

                if !consent.get(ConsentKind::TextAnalysis).await.is_granted() {
                    // The user said yes to this request; they will be asked again next time.
                    warn!(subject = consent.subject(), "Consent accepted but could not be persisted");
                }
                info!(subject = consent.subject(), ai_improvement, "Text analysis consent granted");
                Ok(())
            }
            PromptOutcome::Declined => {
                consent.set(ConsentKind::AiImprovement, false).await;
                consent.set(ConsentKind::TextAnalysis, false).await;
                info!(subject = consent.subject(), "Text analysis consent declined");
                Err(PortError::ConsentDenied)
            }
        }
    }
}
