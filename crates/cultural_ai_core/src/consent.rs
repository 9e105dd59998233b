//! crates/cultural_ai_core/src/consent.rs
//!
//! The consent store: tri-state consent flags on top of a `ConsentStorage` port.
//!
//! Storage failures never reach the caller. Reads degrade to `Unset` and failed
//! writes leave the previous state in place, so callers re-read instead of
//! assuming a write succeeded.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, warn};

use crate::domain::{ConsentKind, ConsentState, ConsentUpdate, ConsentValue};
use crate::ports::{ConsentStorage, PortResult};

const GRANTED: &str = "true";
const DENIED: &str = "false";

/// One write lock per subject, shared by every `ConsentStore` built for that subject.
///
/// Hosts that create a store per request (the HTTP server) keep one registry for
/// the process, so two requests for the same subject cannot interleave the
/// two-key updates of `ConsentStore::set`.
#[derive(Default)]
pub struct ConsentLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConsentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_for(&self, subject: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // Drop locks no store holds any more.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(subject.to_string())
            .or_default()
            .clone()
    }
}

/// Consent flags for one subject (a device or a user).
pub struct ConsentStore {
    storage: Arc<dyn ConsentStorage>,
    subject: String,
    /// Serializes writes so multi-key updates are not interleaved.
    write_lock: Arc<Mutex<()>>,
}

impl ConsentStore {
    /// A store with its own write lock, for hosts that keep one store per subject.
    pub fn new(storage: Arc<dyn ConsentStorage>, subject: impl Into<String>) -> Self {
        Self::with_lock(storage, subject, Arc::new(Mutex::new(())))
    }

    /// A store whose writes share `locks`' lock for the subject.
    pub async fn shared(
        storage: Arc<dyn ConsentStorage>,
        subject: impl Into<String>,
        locks: &ConsentLocks,
    ) -> Self {
        let subject = subject.into();
        let write_lock = locks.lock_for(&subject).await;
        Self::with_lock(storage, subject, write_lock)
    }

    fn with_lock(
        storage: Arc<dyn ConsentStorage>,
        subject: impl Into<String>,
        write_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            storage,
            subject: subject.into(),
            write_lock,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub async fn get(&self, kind: ConsentKind) -> ConsentValue {
        match self.storage.read(&self.subject, kind.storage_key()).await {
            Ok(None) => ConsentValue::Unset,
            Ok(Some(value)) => match value.as_str() {
                GRANTED => ConsentValue::Granted,
                DENIED => ConsentValue::Denied,
                other => {
                    warn!(key = kind.storage_key(), value = other, "Unrecognized consent value; treating as unset");
                    ConsentValue::Unset
                }
            },
            Err(e) => {
                error!(key = kind.storage_key(), "Error retrieving consent: {}", e);
                ConsentValue::Unset
            }
        }
    }

    pub async fn state(&self) -> ConsentState {
        ConsentState {
            text_analysis: self.get(ConsentKind::TextAnalysis).await,
            ai_improvement: self.get(ConsentKind::AiImprovement).await,
        }
    }

    /// Records a consent decision.
    ///
    /// Granting AI improvement also grants text analysis, and denying text
    /// analysis also withdraws AI improvement. The returned flags report which
    /// of those side effects were written.
    pub async fn set(&self, kind: ConsentKind, granted: bool) -> ConsentUpdate {
        let _guard = self.write_lock.lock().await;
        let mut update = ConsentUpdate::default();

        match (kind, granted) {
            (ConsentKind::AiImprovement, true) => {
                if !self.get(ConsentKind::TextAnalysis).await.is_granted() {
                    if !self.write(ConsentKind::TextAnalysis, true).await {
                        // Without the base consent the improvement flag must not be written.
                        return update;
                    }
                    update.text_analysis_implied = true;
                }
                self.write(ConsentKind::AiImprovement, true).await;
            }
            (ConsentKind::TextAnalysis, false) => {
                if self.get(ConsentKind::AiImprovement).await.is_granted() {
                    if !self.write(ConsentKind::AiImprovement, false).await {
                        return update;
                    }
                    update.ai_improvement_revoked = true;
                }
                self.write(ConsentKind::TextAnalysis, false).await;
            }
            (kind, granted) => {
                self.write(kind, granted).await;
            }
        }

        update
    }

    /// Clears both flags back to `Unset`.
    pub async fn reset(&self) {
        let _guard = self.write_lock.lock().await;
        let keys = [
            ConsentKind::TextAnalysis.storage_key(),
            ConsentKind::AiImprovement.storage_key(),
        ];
        if let Err(e) = self.storage.remove(&self.subject, &keys).await {
            error!("Error resetting consents: {}", e);
        }
    }

    async fn write(&self, kind: ConsentKind, granted: bool) -> bool {
        let value = if granted { GRANTED } else { DENIED };
        match self.storage.write(&self.subject, kind.storage_key(), value).await {
            Ok(()) => true,
            Err(e) => {
                error!(key = kind.storage_key(), "Error storing consent: {}", e);
                false
            }
        }
    }
}

//=========================================================================================
// In-Memory Storage
//=========================================================================================

/// Process-local consent storage, used for tests and single-device hosts.
#[derive(Default)]
pub struct MemoryConsentStorage {
    entries: RwLock<HashMap<(String, String), String>>,
}

impl MemoryConsentStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentStorage for MemoryConsentStorage {
    async fn read(&self, subject: &str, key: &str) -> PortResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(subject.to_string(), key.to_string())).cloned())
    }

    async fn write(&self, subject: &str, key: &str, value: &str) -> PortResult<()> {
        self.entries
            .write()
            .await
            .insert((subject.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn remove(&self, subject: &str, keys: &[&str]) -> PortResult<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(&(subject.to_string(), key.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortError;
    use std::time::Duration;

    /// Storage whose writes for one key always fail.
    struct FailingWrites {
        inner: MemoryConsentStorage,
        failing_key: &'static str,
    }

    #[async_trait]
    impl ConsentStorage for FailingWrites {
        async fn read(&self, subject: &str, key: &str) -> PortResult<Option<String>> {
            self.inner.read(subject, key).await
        }

        async fn write(&self, subject: &str, key: &str, value: &str) -> PortResult<()> {
            if key == self.failing_key {
                return Err(PortError::Persistence("disk full".to_string()));
            }
            self.inner.write(subject, key, value).await
        }

        async fn remove(&self, subject: &str, keys: &[&str]) -> PortResult<()> {
            self.inner.remove(subject, keys).await
        }
    }

    /// Storage whose reads and writes yield for a while, so concurrent updates overlap.
    struct SlowStorage {
        inner: MemoryConsentStorage,
    }

    #[async_trait]
    impl ConsentStorage for SlowStorage {
        async fn read(&self, subject: &str, key: &str) -> PortResult<Option<String>> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.inner.read(subject, key).await
        }

        async fn write(&self, subject: &str, key: &str, value: &str) -> PortResult<()> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.inner.write(subject, key, value).await
        }

        async fn remove(&self, subject: &str, keys: &[&str]) -> PortResult<()> {
            self.inner.remove(subject, keys).await
        }
    }

    struct Unreadable;

    #[async_trait]
    impl ConsentStorage for Unreadable {
        async fn read(&self, _: &str, _: &str) -> PortResult<Option<String>> {
            Err(PortError::Persistence("storage missing".to_string()))
        }

        async fn write(&self, _: &str, _: &str, _: &str) -> PortResult<()> {
            Err(PortError::Persistence("storage missing".to_string()))
        }

        async fn remove(&self, _: &str, _: &[&str]) -> PortResult<()> {
            Err(PortError::Persistence("storage missing".to_string()))
        }
    }

    fn store() -> ConsentStore {
        ConsentStore::new(Arc::new(MemoryConsentStorage::new()), "device-1")
    }

    #[tokio::test]
    async fn fresh_store_is_unset() {
        let store = store();
        assert_eq!(store.state().await, ConsentState::default());
        assert_eq!(store.get(ConsentKind::TextAnalysis).await, ConsentValue::Unset);
    }

    #[tokio::test]
    async fn set_and_get_round_trip() {
        let store = store();
        let update = store.set(ConsentKind::TextAnalysis, true).await;
        assert_eq!(update, ConsentUpdate::default());
        assert_eq!(store.get(ConsentKind::TextAnalysis).await, ConsentValue::Granted);

        store.set(ConsentKind::AiImprovement, false).await;
        assert_eq!(store.get(ConsentKind::AiImprovement).await, ConsentValue::Denied);
    }

    #[tokio::test]
    async fn granting_improvement_implies_text_analysis() {
        let store = store();
        let update = store.set(ConsentKind::AiImprovement, true).await;

        assert!(update.text_analysis_implied);
        assert_eq!(store.get(ConsentKind::TextAnalysis).await, ConsentValue::Granted);
        assert_eq!(store.get(ConsentKind::AiImprovement).await, ConsentValue::Granted);
    }

    #[tokio::test]
    async fn no_implied_grant_when_already_granted() {
        let store = store();
        store.set(ConsentKind::TextAnalysis, true).await;
        let update = store.set(ConsentKind::AiImprovement, true).await;
        assert!(!update.text_analysis_implied);
    }

    #[tokio::test]
    async fn denying_text_analysis_withdraws_improvement() {
        let store = store();
        store.set(ConsentKind::AiImprovement, true).await;
        let update = store.set(ConsentKind::TextAnalysis, false).await;

        assert!(update.ai_improvement_revoked);
        assert_eq!(
            store.state().await,
            ConsentState {
                text_analysis: ConsentValue::Denied,
                ai_improvement: ConsentValue::Denied,
            }
        );
    }

    #[tokio::test]
    async fn reset_clears_both_flags() {
        let store = store();
        store.set(ConsentKind::AiImprovement, true).await;
        store.reset().await;
        assert_eq!(store.state().await, ConsentState::default());
    }

    #[tokio::test]
    async fn subjects_are_isolated() {
        let storage: Arc<dyn ConsentStorage> = Arc::new(MemoryConsentStorage::new());
        let alice = ConsentStore::new(storage.clone(), "alice");
        let bob = ConsentStore::new(storage, "bob");

        alice.set(ConsentKind::TextAnalysis, true).await;
        assert_eq!(bob.get(ConsentKind::TextAnalysis).await, ConsentValue::Unset);
    }

    #[tokio::test]
    async fn unreadable_storage_reads_as_unset_and_never_panics() {
        let store = ConsentStore::new(Arc::new(Unreadable), "device-1");
        store.set(ConsentKind::TextAnalysis, true).await;
        store.reset().await;
        assert_eq!(store.get(ConsentKind::TextAnalysis).await, ConsentValue::Unset);
    }

    #[tokio::test]
    async fn failed_base_write_keeps_invariant() {
        let storage = FailingWrites {
            inner: MemoryConsentStorage::new(),
            failing_key: ConsentKind::TextAnalysis.storage_key(),
        };
        let store = ConsentStore::new(Arc::new(storage), "device-1");

        let update = store.set(ConsentKind::AiImprovement, true).await;

        assert!(!update.text_analysis_implied);
        assert_eq!(store.state().await, ConsentState::default());
    }

    #[tokio::test]
    async fn unrecognized_stored_value_is_unset() {
        let storage = Arc::new(MemoryConsentStorage::new());
        storage
            .write("device-1", ConsentKind::TextAnalysis.storage_key(), "maybe")
            .await
            .unwrap();
        let store = ConsentStore::new(storage, "device-1");
        assert_eq!(store.get(ConsentKind::TextAnalysis).await, ConsentValue::Unset);
    }

    #[tokio::test]
    async fn stores_sharing_a_subject_lock_keep_the_invariant_under_concurrency() {
        let storage: Arc<dyn ConsentStorage> = Arc::new(SlowStorage {
            inner: MemoryConsentStorage::new(),
        });
        let locks = ConsentLocks::new();
        let first = ConsentStore::shared(storage.clone(), "user-1", &locks).await;
        let second = ConsentStore::shared(storage, "user-1", &locks).await;

        tokio::join!(first.set(ConsentKind::AiImprovement, true), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            second.set(ConsentKind::TextAnalysis, false).await
        });

        let state = first.state().await;
        assert!(
            !state.ai_improvement.is_granted() || state.text_analysis.is_granted(),
            "AI improvement granted without text analysis: {state:?}"
        );
        assert_eq!(
            state,
            ConsentState {
                text_analysis: ConsentValue::Denied,
                ai_improvement: ConsentValue::Denied,
            }
        );
    }

    #[tokio::test]
    async fn lock_registry_hands_out_one_lock_per_subject() {
        let locks = ConsentLocks::new();
        let a = locks.lock_for("user-1").await;
        let b = locks.lock_for("user-1").await;
        let other = locks.lock_for("user-2").await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
