//! crates/cultural_ai_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Apart from the retention tag (which appears inside log projections), these
//! types are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

//=========================================================================================
// Consent
//=========================================================================================

/// The two independent consent flags a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentKind {
    TextAnalysis,
    AiImprovement,
}

impl ConsentKind {
    /// The storage key under which the flag is persisted.
    pub fn storage_key(self) -> &'static str {
        match self {
            ConsentKind::TextAnalysis => "consent_text_analysis",
            ConsentKind::AiImprovement => "consent_ai_improvement",
        }
    }
}

/// Tri-state value of a single consent flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsentValue {
    Granted,
    Denied,
    #[default]
    Unset,
}

impl ConsentValue {
    pub fn from_granted(granted: bool) -> Self {
        if granted {
            ConsentValue::Granted
        } else {
            ConsentValue::Denied
        }
    }

    pub fn is_granted(self) -> bool {
        self == ConsentValue::Granted
    }
}

/// Snapshot of both consent flags.
///
/// `ai_improvement == Granted` implies `text_analysis == Granted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsentState {
    pub text_analysis: ConsentValue,
    pub ai_improvement: ConsentValue,
}

/// Side effects of a consent write that the UI should tell the user about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsentUpdate {
    /// Granting AI improvement also granted text analysis.
    pub text_analysis_implied: bool,
    /// Denying text analysis also withdrew AI improvement.
    pub ai_improvement_revoked: bool,
}

/// The answer a user gives to the consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    Accepted { ai_improvement: bool },
    Declined,
}

//=========================================================================================
// Analysis
//=========================================================================================

/// Who wrote the text under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextOrigin {
    /// The user's own draft.
    #[default]
    Mine,
    /// A message the user received from someone in the target culture.
    Theirs,
}

impl TextOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            TextOrigin::Mine => "mine",
            TextOrigin::Theirs => "theirs",
        }
    }
}

/// A single text-analysis request. Lives only for the duration of one call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub text: String,
    pub culture_id: String,
    pub origin: TextOrigin,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>, culture_id: impl Into<String>, origin: TextOrigin) -> Self {
        Self {
            text: text.into(),
            culture_id: culture_id.into(),
            origin,
        }
    }

    /// Returns the name of the first missing required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.text.trim().is_empty() {
            Some("text")
        } else if self.culture_id.trim().is_empty() {
            Some("cultureId")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    Idiom,
    Formality,
    Context,
    General,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingKind::Idiom => "Idiom",
            FindingKind::Formality => "Formality",
            FindingKind::Context => "Context",
            FindingKind::General => "General",
        }
    }

    /// Case-insensitive parse of a kind label.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "idiom" => Some(FindingKind::Idiom),
            "formality" => Some(FindingKind::Formality),
            "context" => Some(FindingKind::Context),
            "general" => Some(FindingKind::General),
            _ => None,
        }
    }
}

/// One structured observation about the analyzed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub excerpt: String,
    pub explanation: String,
    pub suggestion: Option<String>,
    pub related_idiom_id: Option<String>,
}

/// The result of one analysis. Owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingReport {
    pub summary: String,
    pub issues: Vec<Finding>,
    pub alternatives: Option<Vec<String>>,
}

impl FindingReport {
    pub const FAILURE_SUMMARY: &'static str = "Error analyzing text. Please try again later.";

    /// The degraded-but-valid report returned when analysis could not run.
    pub fn failed() -> Self {
        Self {
            summary: Self::FAILURE_SUMMARY.to_string(),
            issues: Vec::new(),
            alternatives: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.summary == Self::FAILURE_SUMMARY && self.issues.is_empty()
    }
}

/// Result of translating an idiom between two cultures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdiomTranslation {
    pub original_idiom: String,
    pub translation: String,
    pub literal_translation: Option<String>,
    pub explanation: String,
    pub cultural_notes: Vec<String>,
}

//=========================================================================================
// Retention
//=========================================================================================

/// Classifies a piece of data for the purpose of persistence and redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionTag {
    AnalyzedText,
    FeedbackText,
    ActivityLog,
}

/// How long data under a tag may live and whether it must be anonymized first.
/// A zero `max_age` means "never persist; metadata only".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionRule {
    pub max_age: Duration,
    pub must_anonymize: bool,
}

impl RetentionRule {
    pub const fn never_persist() -> Self {
        Self {
            max_age: Duration::ZERO,
            must_anonymize: true,
        }
    }

    pub const fn days(days: u64) -> Self {
        Self {
            max_age: Duration::from_secs(days.saturating_mul(24 * 60 * 60)),
            must_anonymize: true,
        }
    }
}

//=========================================================================================
// Feedback
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Bias,
    Inaccuracy,
    Offensive,
    Other,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 4] = [
        FeedbackKind::Bias,
        FeedbackKind::Inaccuracy,
        FeedbackKind::Offensive,
        FeedbackKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::Bias => "bias",
            FeedbackKind::Inaccuracy => "inaccuracy",
            FeedbackKind::Offensive => "offensive",
            FeedbackKind::Other => "other",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(label))
    }
}

/// Feedback exactly as the user submitted it, before validation and redaction.
#[derive(Debug, Clone)]
pub struct FeedbackSubmission {
    pub analysis_id: Option<String>,
    pub culture_id: Option<String>,
    pub kind: String,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
    pub user_id: Option<String>,
}

/// Validated, anonymized feedback as handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedFeedback {
    pub id: Uuid,
    pub analysis_id: Option<String>,
    pub culture_id: Option<String>,
    pub kind: FeedbackKind,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
    pub user_id: String,
}

/// Outcome of a feedback submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackReceipt {
    pub success: bool,
    pub message: Option<String>,
}
