//! services/api/src/adapters/analysis_llm.rs
//!
//! This module contains the provider-backed cultural analyzer.
//! It implements the `CulturalAnalyzer` port from the `core` crate.
//!
//! The adapter never fails: with no API key it answers with the heuristic
//! analyzer, and a timeout, transport error or malformed completion degrades
//! according to the configured `ProviderFallback`. Failed calls are not retried.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use cultural_ai_core::{
    analyzer::{analysis_prompt, ANALYSIS_SYSTEM_PROMPT},
    domain::{AnalysisRequest, Finding, FindingKind, FindingReport},
    ports::{CulturalAnalyzer, PortError, PortResult},
    HeuristicAnalyzer,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProviderFallback;

//=========================================================================================
// Provider Response Records
//=========================================================================================

/// The JSON object the model is instructed to return.
#[derive(Deserialize)]
struct ProviderReport {
    summary: String,
    issues: Vec<ProviderIssue>,
    #[serde(default)]
    alternatives: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ProviderIssue {
    #[serde(rename = "type")]
    kind: String,
    text: String,
    explanation: String,
    #[serde(default)]
    suggestion: Option<String>,
    #[serde(default, rename = "idiomId")]
    idiom_id: Option<String>,
}

impl ProviderReport {
    fn into_domain(self) -> PortResult<FindingReport> {
        if self.summary.trim().is_empty() {
            return Err(PortError::AnalysisUnavailable(
                "Provider report has an empty summary".to_string(),
            ));
        }
        let issues = self
            .issues
            .into_iter()
            .map(|issue| Finding {
                // Labels outside the known set ("Directness", "Tone", ...) are contextual notes.
                kind: FindingKind::parse(&issue.kind).unwrap_or(FindingKind::Context),
                excerpt: issue.text,
                explanation: issue.explanation,
                suggestion: issue.suggestion.filter(|s| !s.trim().is_empty()),
                related_idiom_id: issue.idiom_id,
            })
            .collect();
        let alternatives = self.alternatives.filter(|a| !a.is_empty());

        Ok(FindingReport {
            summary: self.summary,
            issues,
            alternatives,
        })
    }
}

/// Parses a completion into a report, rejecting anything that is not the expected shape.
pub fn parse_report(content: &str) -> PortResult<FindingReport> {
    let body = strip_code_fence(content.trim());
    let report: ProviderReport = serde_json::from_str(body)
        .map_err(|e| PortError::AnalysisUnavailable(format!("Malformed provider response: {}", e)))?;
    report.into_domain()
}

pub(crate) fn strip_code_fence(content: &str) -> &str {
    content
        .strip_prefix("```json")
        .or_else(|| content.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(content)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CulturalAnalyzer` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalysisAdapter {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    timeout: Duration,
    fallback: ProviderFallback,
    heuristic: HeuristicAnalyzer,
}

impl OpenAiAnalysisAdapter {
    /// Creates a new `OpenAiAnalysisAdapter`. `client` is `None` when no API key is configured.
    pub fn new(
        client: Option<Client<OpenAIConfig>>,
        model: String,
        timeout: Duration,
        fallback: ProviderFallback,
    ) -> Self {
        Self {
            client,
            model,
            timeout,
            fallback,
            heuristic: HeuristicAnalyzer::new(),
        }
    }

    async fn request_report(
        &self,
        client: &Client<OpenAIConfig>,
        request: &AnalysisRequest,
        culture_name: &str,
    ) -> PortResult<FindingReport> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(ANALYSIS_SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(analysis_prompt(request, culture_name))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let completion_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .temperature(0.7)
            .max_completion_tokens(800u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, client.chat().create(completion_request))
            .await
            .map_err(|_| {
                PortError::AnalysisUnavailable(format!(
                    "Provider did not answer within {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e: OpenAIError| PortError::AnalysisUnavailable(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::AnalysisUnavailable(
                    "Analysis LLM response contained no text content.".to_string(),
                )
            })?;

        parse_report(&content)
    }
}

//=========================================================================================
// `CulturalAnalyzer` Trait Implementation
//=========================================================================================

#[async_trait]
impl CulturalAnalyzer for OpenAiAnalysisAdapter {
    async fn analyze(&self, request: &AnalysisRequest, culture_name: &str) -> FindingReport {
        let Some(client) = &self.client else {
            debug!("No provider credential configured; using heuristic analysis");
            return self.heuristic.report(request, culture_name);
        };

        match self.request_report(client, request, culture_name).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Error in provider analysis: {}", e);
                match self.fallback {
                    ProviderFallback::Report => FindingReport::failed(),
                    ProviderFallback::Heuristic => self.heuristic.report(request, culture_name),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_report() {
        let report = parse_report(
            r#"{
                "summary": "Mostly fine.",
                "issues": [
                    {"type": "idiom", "text": "break a leg", "explanation": "Unclear", "suggestion": "Good luck", "idiomId": "idiom123"},
                    {"type": "Directness", "text": "No.", "explanation": "Blunt", "suggestion": ""}
                ],
                "alternatives": ["Good luck!"]
            }"#,
        )
        .unwrap();

        assert_eq!(report.summary, "Mostly fine.");
        assert_eq!(report.issues[0].kind, FindingKind::Idiom);
        assert_eq!(report.issues[0].related_idiom_id.as_deref(), Some("idiom123"));
        assert_eq!(report.issues[1].kind, FindingKind::Context);
        assert_eq!(report.issues[1].suggestion, None);
        assert_eq!(report.alternatives, Some(vec!["Good luck!".to_string()]));
    }

    #[test]
    fn accepts_fenced_json_and_missing_alternatives() {
        let report = parse_report("```json\n{\"summary\": \"ok\", \"issues\": []}\n```").unwrap();
        assert!(report.issues.is_empty());
        assert_eq!(report.alternatives, None);
    }

    #[test]
    fn rejects_malformed_shapes() {
        for content in [
            "not json at all",
            r#"{"issues": []}"#,
            r#"{"summary": "x", "issues": "none"}"#,
            r#"{"summary": "x", "issues": [{"type": "Idiom"}]}"#,
            r#"{"summary": "  ", "issues": []}"#,
        ] {
            assert!(
                matches!(parse_report(content), Err(PortError::AnalysisUnavailable(_))),
                "{content} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn missing_credential_uses_heuristics() {
        let adapter = OpenAiAnalysisAdapter::new(
            None,
            "gpt-3.5-turbo".to_string(),
            Duration::from_secs(12),
            ProviderFallback::Report,
        );
        let request = AnalysisRequest::new(
            "hey, break a leg!",
            "jp",
            cultural_ai_core::TextOrigin::Mine,
        );

        let report = adapter.analyze(&request, "Japanese").await;

        assert!(!report.is_failure());
        assert_eq!(report.issues.len(), 2);
    }
}
