//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use cultural_ai_core::{
    ports::{ConsentStorage, CultureDirectory, IdiomTranslator},
    AnalysisGate, ConsentLocks, ConsentStore, FeedbackRelay,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AnalysisGate>,
    pub consent_storage: Arc<dyn ConsentStorage>,
    /// Per-subject write locks shared by every request's consent store.
    pub consent_locks: Arc<ConsentLocks>,
    pub cultures: Arc<dyn CultureDirectory>,
    pub feedback: Arc<FeedbackRelay>,
    pub idioms: Arc<dyn IdiomTranslator>,
}

impl AppState {
    /// A consent store scoped to one subject (the `x-user-id` of the request).
    pub async fn consent_for(&self, subject: &str) -> ConsentStore {
        ConsentStore::shared(self.consent_storage.clone(), subject, &self.consent_locks).await
    }
}
