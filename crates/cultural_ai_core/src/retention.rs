//! crates/cultural_ai_core/src/retention.rs
//!
//! Data retention rules and the redaction applied before anything is logged or stored.
//!
//! `LogProjection` can only be built by `RetentionPolicy::prepare_for_log`, and the
//! `DiagnosticLog` port only accepts projections, so an unredacted payload cannot
//! reach the durable log.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{AnalysisRequest, RetentionRule, RetentionTag};

//=========================================================================================
// Anonymization
//=========================================================================================

pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";
pub const PHONE_PLACEHOLDER: &str = "[PHONE]";
pub const NAME_PLACEHOLDER: &str = "[NAME]";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

// Digit runs must start and end on a word boundary, so longer numbers
// (order ids, card numbers) are left alone instead of being half-redacted.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-])?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b")
        .expect("valid phone pattern")
});

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:Mr|Mrs|Ms|Dr)\.\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\b")
        .expect("valid name pattern")
});

/// Replaces email addresses, phone numbers and honorific-prefixed names with
/// fixed placeholders. Pure and idempotent.
pub fn anonymize(text: &str) -> String {
    let text = EMAIL_PATTERN.replace_all(text, EMAIL_PLACEHOLDER);
    let text = PHONE_PATTERN.replace_all(&text, PHONE_PLACEHOLDER);
    let text = NAME_PATTERN.replace_all(&text, NAME_PLACEHOLDER);
    text.into_owned()
}

//=========================================================================================
// Log Payloads and Projections
//=========================================================================================

/// A candidate log entry: an optional free-text field plus non-content metadata.
#[derive(Debug, Clone, Default)]
pub struct LogPayload {
    text: Option<String>,
    fields: BTreeMap<String, String>,
}

impl LogPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.insert(key.into(), value.to_string());
        self
    }
}

impl From<&AnalysisRequest> for LogPayload {
    fn from(request: &AnalysisRequest) -> Self {
        LogPayload::new()
            .with_text(request.text.clone())
            .with_field("culture_id", &request.culture_id)
            .with_field("origin", request.origin.as_str())
    }
}

/// A log entry that has passed through the retention policy.
#[derive(Debug, Clone, Serialize)]
pub struct LogProjection {
    timestamp: DateTime<Utc>,
    data_type: RetentionTag,
    content_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

impl LogProjection {
    pub fn data_type(&self) -> RetentionTag {
        self.data_type
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

//=========================================================================================
// RetentionPolicy
//=========================================================================================

/// Static, read-only retention configuration.
///
/// `AnalyzedText` is always "never persist"; only the other tags are tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    activity_log: RetentionRule,
    feedback_text: RetentionRule,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(RetentionRule::days(90), RetentionRule::days(365))
    }
}

impl RetentionPolicy {
    pub fn new(activity_log: RetentionRule, feedback_text: RetentionRule) -> Self {
        Self {
            activity_log,
            feedback_text,
        }
    }

    pub fn rule(&self, tag: RetentionTag) -> RetentionRule {
        match tag {
            RetentionTag::AnalyzedText => RetentionRule::never_persist(),
            RetentionTag::ActivityLog => self.activity_log,
            RetentionTag::FeedbackText => self.feedback_text,
        }
    }

    pub fn may_persist(&self, tag: RetentionTag) -> bool {
        !self.rule(tag).max_age.is_zero()
    }

    /// Projects a payload into something safe to write to a durable log.
    ///
    /// Tags that may not be persisted keep only metadata and the content length;
    /// the others keep an anonymized copy of the text.
    pub fn prepare_for_log(&self, tag: RetentionTag, payload: LogPayload) -> LogProjection {
        let LogPayload { text, fields } = payload;
        let content_length = text.as_deref().map_or(0, |t| t.encode_utf16().count());

        let text = if tag == RetentionTag::AnalyzedText || !self.may_persist(tag) {
            None
        } else {
            text.map(|t| anonymize(&t))
        };

        LogProjection {
            timestamp: Utc::now(),
            data_type: tag,
            content_length,
            text,
            fields,
        }
    }

    /// Returns the form of `text` that may be written to durable storage, if any.
    pub fn prepare_for_storage(&self, tag: RetentionTag, text: &str) -> Option<String> {
        if !self.may_persist(tag) {
            return None;
        }
        if self.rule(tag).must_anonymize {
            Some(anonymize(text))
        } else {
            Some(text.to_string())
        }
    }

    pub fn should_retain(
        &self,
        tag: RetentionTag,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.may_persist(tag) {
            return false;
        }
        match (now - created_at).to_std() {
            Ok(age) => age <= self.rule(tag).max_age,
            // Created "in the future" (clock skew): keep it.
            Err(_) => true,
        }
    }

    /// Oldest creation time that is still retained for `tag`.
    pub fn retention_cutoff(&self, tag: RetentionTag, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.may_persist(tag) {
            return None;
        }
        chrono::Duration::from_std(self.rule(tag).max_age)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
    }
}
