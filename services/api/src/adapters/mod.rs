pub mod analysis_llm;
pub mod db;
pub mod diagnostics;
pub mod feedback_sink;
pub mod idiom_llm;
