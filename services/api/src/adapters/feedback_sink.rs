//! services/api/src/adapters/feedback_sink.rs
//!
//! Destinations for relayed feedback: the privacy log (default) or the
//! `feedback` table, plus the retention purge that keeps that table bounded.

use async_trait::async_trait;
use chrono::Utc;
use cultural_ai_core::{
    domain::{RelayedFeedback, RetentionTag},
    ports::{DiagnosticLog, FeedbackSink, PortError, PortResult},
    retention::{LogPayload, RetentionPolicy},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::db::DbAdapter;

//=========================================================================================
// Log Sink
//=========================================================================================

/// Writes each feedback entry to the diagnostic log as a `FeedbackText` projection.
pub struct LogFeedbackSink {
    log: Arc<dyn DiagnosticLog>,
    retention: RetentionPolicy,
}

impl LogFeedbackSink {
    pub fn new(log: Arc<dyn DiagnosticLog>, retention: RetentionPolicy) -> Self {
        Self { log, retention }
    }
}

#[async_trait]
impl FeedbackSink for LogFeedbackSink {
    async fn relay(&self, feedback: &RelayedFeedback) -> PortResult<()> {
        let mut payload = LogPayload::new()
            .with_text(feedback.text.clone())
            .with_field("feedback_id", feedback.id)
            .with_field("kind", feedback.kind.as_str())
            .with_field("user_id", &feedback.user_id)
            .with_field("submitted_at", feedback.submitted_at.to_rfc3339());
        if let Some(analysis_id) = &feedback.analysis_id {
            payload = payload.with_field("analysis_id", analysis_id);
        }
        if let Some(culture_id) = &feedback.culture_id {
            payload = payload.with_field("culture_id", culture_id);
        }

        let entry = self
            .retention
            .prepare_for_log(RetentionTag::FeedbackText, payload);
        self.log.record("AI feedback received", &entry);
        Ok(())
    }
}

//=========================================================================================
// Database Sink
//=========================================================================================

/// Stores feedback in PostgreSQL, subject to the `FeedbackText` retention rule.
pub struct DbFeedbackSink {
    db: Arc<DbAdapter>,
    retention: RetentionPolicy,
}

impl DbFeedbackSink {
    pub fn new(db: Arc<DbAdapter>, retention: RetentionPolicy) -> Self {
        Self { db, retention }
    }
}

#[async_trait]
impl FeedbackSink for DbFeedbackSink {
    async fn relay(&self, feedback: &RelayedFeedback) -> PortResult<()> {
        let text = self
            .retention
            .prepare_for_storage(RetentionTag::FeedbackText, &feedback.text)
            .ok_or_else(|| {
                PortError::Persistence("Feedback text may not be persisted".to_string())
            })?;
        self.db.insert_feedback(feedback, &text).await
    }
}

//=========================================================================================
// Retention Purge
//=========================================================================================

/// Periodically deletes stored feedback older than the `FeedbackText` cutoff.
/// Runs until the task is aborted.
pub async fn run_feedback_purge(db: Arc<DbAdapter>, retention: RetentionPolicy, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let Some(cutoff) = retention.retention_cutoff(RetentionTag::FeedbackText, Utc::now())
        else {
            continue;
        };
        match db.delete_feedback_before(cutoff).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, %cutoff, "Purged expired feedback"),
            Err(e) => error!("Feedback purge failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cultural_ai_core::domain::FeedbackKind;
    use cultural_ai_core::retention::LogProjection;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingLog {
        entries: Mutex<Vec<(String, LogProjection)>>,
    }

    impl DiagnosticLog for RecordingLog {
        fn record(&self, message: &str, entry: &LogProjection) {
            self.entries
                .lock()
                .unwrap()
                .push((message.to_string(), entry.clone()));
        }
    }

    #[tokio::test]
    async fn log_sink_records_a_feedback_projection() {
        let log = Arc::new(RecordingLog::default());
        let sink = LogFeedbackSink::new(log.clone(), RetentionPolicy::default());
        let feedback = RelayedFeedback {
            id: Uuid::new_v4(),
            analysis_id: Some("a-1".to_string()),
            culture_id: None,
            kind: FeedbackKind::Offensive,
            text: "reach me on 555-123-4567".to_string(),
            submitted_at: Utc::now(),
            user_id: "anonymous".to_string(),
        };

        sink.relay(&feedback).await.unwrap();

        let entries = log.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let (message, entry) = &entries[0];
        assert_eq!(message, "AI feedback received");
        assert_eq!(entry.data_type(), RetentionTag::FeedbackText);
        assert_eq!(entry.text(), Some("reach me on [PHONE]"));
        assert_eq!(entry.field("kind"), Some("offensive"));
        assert_eq!(entry.field("analysis_id"), Some("a-1"));
        assert_eq!(entry.field("culture_id"), None);
    }
}
