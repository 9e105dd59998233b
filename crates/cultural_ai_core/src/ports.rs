//! crates/cultural_ai_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;

use crate::domain::{
    AnalysisRequest, FindingReport, IdiomTranslation, PromptOutcome, RelayedFeedback,
};
use crate::retention::LogProjection;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// Consent has never been given and no prompt answer is available.
    #[error("Consent for text analysis is required")]
    ConsentRequired,
    /// The user declined consent; they must change it in their settings.
    #[error("Consent for text analysis was declined")]
    ConsentDenied,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Analysis is unavailable: {0}")]
    AnalysisUnavailable(String),
    #[error("Failed to persist data: {0}")]
    Persistence(String),
    #[error("The operation was cancelled")]
    Cancelled,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable key/value storage for consent flags, scoped by subject (a device or user).
#[async_trait]
pub trait ConsentStorage: Send + Sync {
    async fn read(&self, subject: &str, key: &str) -> PortResult<Option<String>>;

    async fn write(&self, subject: &str, key: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, subject: &str, keys: &[&str]) -> PortResult<()>;
}

/// The UI collaborator that asks the user for consent.
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Shows the consent prompt and waits for the user's answer.
    async fn show_consent_prompt(&self) -> PortResult<PromptOutcome>;
}

/// Produces a finding report for a piece of text.
///
/// Implementations never fail: any internal problem is expressed as
/// `FindingReport::failed()`.
#[async_trait]
pub trait CulturalAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest, culture_name: &str) -> FindingReport;
}

/// Resolves a culture id to its display name.
#[async_trait]
pub trait CultureDirectory: Send + Sync {
    async fn culture_name(&self, culture_id: &str) -> PortResult<String>;
}

/// Durable diagnostic log. Only retention-projected entries can be written.
pub trait DiagnosticLog: Send + Sync {
    fn record(&self, message: &str, entry: &LogProjection);
}

/// Destination for anonymized user feedback.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn relay(&self, feedback: &RelayedFeedback) -> PortResult<()>;
}

#[async_trait]
pub trait IdiomTranslator: Send + Sync {
    /// Translates an idiom; like the analyzer, degrades instead of failing.
    async fn translate(
        &self,
        idiom: &str,
        source_culture: &str,
        target_culture: &str,
    ) -> IdiomTranslation;
}
