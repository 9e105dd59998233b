pub mod analyzer;
pub mod consent;
pub mod domain;
pub mod feedback;
pub mod gate;
pub mod ports;
pub mod retention;

pub use analyzer::HeuristicAnalyzer;
pub use consent::{ConsentLocks, ConsentStore, MemoryConsentStorage};
pub use domain::{
    AnalysisRequest, ConsentKind, ConsentState, ConsentUpdate, ConsentValue, FeedbackKind,
    FeedbackReceipt, FeedbackSubmission, Finding, FindingKind, FindingReport, IdiomTranslation,
    PromptOutcome, RelayedFeedback, RetentionRule, RetentionTag, TextOrigin,
};
pub use feedback::FeedbackRelay;
pub use gate::AnalysisGate;
pub use ports::{
    ConsentPrompt, ConsentStorage, CultureDirectory, CulturalAnalyzer, DiagnosticLog,
    FeedbackSink, IdiomTranslator, PortError, PortResult,
};
pub use retention::{anonymize, LogPayload, LogProjection, RetentionPolicy};
