//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `CultureDirectory` and `ConsentStorage` ports from the `core` crate. It also owns
//! the feedback table used by the database feedback sink. All interactions with
//! PostgreSQL go through `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cultural_ai_core::domain::RelayedFeedback;
use cultural_ai_core::ports::{ConsentStorage, CultureDirectory, PortError, PortResult};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the culture lookup and consent storage ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Stores one relayed feedback entry. `feedback_text` must already be the
    /// retention-prepared form of the text.
    pub async fn insert_feedback(
        &self,
        feedback: &RelayedFeedback,
        feedback_text: &str,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO feedback (id, analysis_id, culture_id, kind, feedback_text, user_id, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(feedback.id)
        .bind(feedback.analysis_id.as_deref())
        .bind(feedback.culture_id.as_deref())
        .bind(feedback.kind.as_str())
        .bind(feedback_text)
        .bind(&feedback.user_id)
        .bind(feedback.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Deletes feedback submitted before `cutoff`, returning the number of rows removed.
    pub async fn delete_feedback_before(&self, cutoff: DateTime<Utc>) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM feedback WHERE submitted_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CultureRecord {
    culture_name: String,
}

#[derive(FromRow)]
struct ConsentRecord {
    consent_value: String,
}

//=========================================================================================
// `CultureDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl CultureDirectory for DbAdapter {
    async fn culture_name(&self, culture_id: &str) -> PortResult<String> {
        let record = sqlx::query_as::<_, CultureRecord>(
            "SELECT culture_name FROM cultures WHERE culture_id = $1",
        )
        .bind(culture_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Culture {} not found", culture_id))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.culture_name)
    }
}

//=========================================================================================
// `ConsentStorage` Trait Implementation
//=========================================================================================

#[async_trait]
impl ConsentStorage for DbAdapter {
    async fn read(&self, subject: &str, key: &str) -> PortResult<Option<String>> {
        let record = sqlx::query_as::<_, ConsentRecord>(
            "SELECT consent_value FROM consents WHERE subject = $1 AND consent_key = $2",
        )
        .bind(subject)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(record.map(|r| r.consent_value))
    }

    async fn write(&self, subject: &str, key: &str, value: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO consents (subject, consent_key, consent_value, updated_at) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (subject, consent_key) \
             DO UPDATE SET consent_value = EXCLUDED.consent_value, updated_at = NOW()",
        )
        .bind(subject)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, subject: &str, keys: &[&str]) -> PortResult<()> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        sqlx::query("DELETE FROM consents WHERE subject = $1 AND consent_key = ANY($2)")
            .bind(subject)
            .bind(keys)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }
}
