//! services/api/src/adapters/diagnostics.rs
//!
//! The durable diagnostic log, backed by `tracing`. Every entry is a retention
//! projection, emitted as JSON on the `privacy` target.

use cultural_ai_core::{ports::DiagnosticLog, retention::LogProjection};
use tracing::info;

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnosticLog;

impl DiagnosticLog for TracingDiagnosticLog {
    fn record(&self, message: &str, entry: &LogProjection) {
        info!(
            target: "privacy",
            data_type = ?entry.data_type(),
            entry = %entry.to_json(),
            "{}",
            message
        );
    }
}
