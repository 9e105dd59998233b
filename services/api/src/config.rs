//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use cultural_ai_core::{RetentionPolicy, RetentionRule};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Upper bound for the retention day settings (about a century).
const MAX_RETENTION_DAYS: u64 = 36_500;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which analyzer strategy serves `/analysis/text`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalyzerMode {
    Provider,
    Heuristic,
}

/// What a request-time provider failure degrades to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderFallback {
    /// The "analysis failed" report with no findings.
    Report,
    /// The heuristic analyzer's report.
    Heuristic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackSinkKind {
    Log,
    Database,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_allowed_origin: String,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub analysis_model: String,
    pub analyzer_mode: AnalyzerMode,
    pub analysis_timeout: Duration,
    pub provider_fallback: ProviderFallback,
    pub feedback_sink: FeedbackSinkKind,
    pub retention: RetentionPolicy,
    pub retention_purge_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = parse_or(&var, "BIND_ADDRESS", "0.0.0.0:3000".parse::<SocketAddr>())?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_allowed_origin =
            var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Analysis Provider Settings (key is optional) ---
        let openai_api_key = var("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        let openai_api_base = var("OPENAI_API_BASE");
        let analysis_model = var("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string());

        let analyzer_mode = match lowercase(&var, "ANALYZER_MODE").as_deref() {
            None | Some("provider") => AnalyzerMode::Provider,
            Some("heuristic") => AnalyzerMode::Heuristic,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "ANALYZER_MODE".to_string(),
                    format!("'{}' is not one of provider, heuristic", other),
                ))
            }
        };

        let timeout_secs: u64 = parse_or(&var, "ANALYSIS_TIMEOUT_SECS", Ok::<u64, ConfigError>(12))?;
        if !(1..=60).contains(&timeout_secs) {
            return Err(ConfigError::InvalidValue(
                "ANALYSIS_TIMEOUT_SECS".to_string(),
                "must be between 1 and 60".to_string(),
            ));
        }

        let provider_fallback =
            match lowercase(&var, "PROVIDER_FAILURE_FALLBACK").as_deref() {
                None | Some("report") => ProviderFallback::Report,
                Some("heuristic") => ProviderFallback::Heuristic,
                Some(other) => {
                    return Err(ConfigError::InvalidValue(
                        "PROVIDER_FAILURE_FALLBACK".to_string(),
                        format!("'{}' is not one of report, heuristic", other),
                    ))
                }
            };

        let feedback_sink = match lowercase(&var, "FEEDBACK_SINK").as_deref() {
            None | Some("log") => FeedbackSinkKind::Log,
            Some("database") => FeedbackSinkKind::Database,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "FEEDBACK_SINK".to_string(),
                    format!("'{}' is not one of log, database", other),
                ))
            }
        };

        // --- Retention Settings ---
        let activity_days: u64 = parse_or(&var, "RETENTION_ACTIVITY_LOG_DAYS", Ok::<u64, ConfigError>(90))?;
        let feedback_days: u64 = parse_or(&var, "RETENTION_FEEDBACK_DAYS", Ok::<u64, ConfigError>(365))?;
        let purge_secs: u64 = parse_or(&var, "RETENTION_PURGE_INTERVAL_SECS", Ok::<u64, ConfigError>(3600))?;
        for (name, days) in [
            ("RETENTION_ACTIVITY_LOG_DAYS", activity_days),
            ("RETENTION_FEEDBACK_DAYS", feedback_days),
        ] {
            if days > MAX_RETENTION_DAYS {
                return Err(ConfigError::InvalidValue(
                    name.to_string(),
                    format!("must be at most {} days", MAX_RETENTION_DAYS),
                ));
            }
        }
        if purge_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RETENTION_PURGE_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_allowed_origin,
            openai_api_key,
            openai_api_base,
            analysis_model,
            analyzer_mode,
            analysis_timeout: Duration::from_secs(timeout_secs),
            provider_fallback,
            feedback_sink,
            retention: RetentionPolicy::new(
                RetentionRule::days(activity_days),
                RetentionRule::days(feedback_days),
            ),
            retention_purge_interval: Duration::from_secs(purge_secs),
        })
    }
}

fn lowercase<F>(var: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(name).map(|value| value.trim().to_lowercase())
}

/// Parses `name` if it is set, otherwise falls back to `default`.
fn parse_or<F, T, E>(var: &F, name: &str, default: Result<T, E>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
    E: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => default.map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cultural_ai_core::RetentionTag;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/culture")]).unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.analysis_model, "gpt-3.5-turbo");
        assert_eq!(config.analyzer_mode, AnalyzerMode::Provider);
        assert_eq!(config.analysis_timeout, Duration::from_secs(12));
        assert_eq!(config.provider_fallback, ProviderFallback::Report);
        assert_eq!(config.feedback_sink, FeedbackSinkKind::Log);
        assert_eq!(config.retention, RetentionPolicy::default());
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(var)) if var == "DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("RUST_LOG", "debug"),
            ("OPENAI_API_KEY", "sk-test"),
            ("ANALYZER_MODE", "Heuristic"),
            ("ANALYSIS_TIMEOUT_SECS", "15"),
            ("PROVIDER_FAILURE_FALLBACK", "heuristic"),
            ("FEEDBACK_SINK", "database"),
            ("RETENTION_FEEDBACK_DAYS", "30"),
        ])
        .unwrap();

        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.analyzer_mode, AnalyzerMode::Heuristic);
        assert_eq!(config.analysis_timeout, Duration::from_secs(15));
        assert_eq!(config.provider_fallback, ProviderFallback::Heuristic);
        assert_eq!(config.feedback_sink, FeedbackSinkKind::Database);
        assert_eq!(
            config.retention.rule(RetentionTag::FeedbackText),
            RetentionRule::days(30)
        );
        assert!(!config.retention.may_persist(RetentionTag::AnalyzedText));
    }

    #[test]
    fn blank_api_key_counts_as_absent() {
        let config = load(&[("DATABASE_URL", "postgres://db"), ("OPENAI_API_KEY", "  ")]).unwrap();
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (name, value) in [
            ("BIND_ADDRESS", "not-an-address"),
            ("RUST_LOG", "chatty"),
            ("ANALYZER_MODE", "magic"),
            ("ANALYSIS_TIMEOUT_SECS", "0"),
            ("ANALYSIS_TIMEOUT_SECS", "soon"),
            ("PROVIDER_FAILURE_FALLBACK", "sometimes"),
            ("FEEDBACK_SINK", "email"),
            ("RETENTION_ACTIVITY_LOG_DAYS", "36501"),
            ("RETENTION_FEEDBACK_DAYS", "18446744073709551615"),
            ("RETENTION_PURGE_INTERVAL_SECS", "0"),
        ] {
            let result = load(&[("DATABASE_URL", "postgres://db"), (name, value)]);
            assert!(
                matches!(&result, Err(ConfigError::InvalidValue(var, _)) if var == name),
                "{name}={value} should be rejected"
            );
        }
    }
}
