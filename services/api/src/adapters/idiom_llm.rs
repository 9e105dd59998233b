//! services/api/src/adapters/idiom_llm.rs
//!
//! Adapter for idiom translation between two cultures.
//! It implements the `IdiomTranslator` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use cultural_ai_core::{
    domain::IdiomTranslation,
    ports::{IdiomTranslator, PortError, PortResult},
};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::analysis_llm::strip_code_fence;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationRecord {
    translation: String,
    #[serde(default)]
    literal_translation: Option<String>,
    explanation: String,
    #[serde(default)]
    cultural_notes: Vec<String>,
}

pub struct OpenAiIdiomAdapter {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    timeout: Duration,
}

impl OpenAiIdiomAdapter {
    pub fn new(client: Option<Client<OpenAIConfig>>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    async fn request_translation(
        &self,
        client: &Client<OpenAIConfig>,
        idiom: &str,
        source_culture: &str,
        target_culture: &str,
    ) -> PortResult<IdiomTranslation> {
        let prompt = format!(
            r#"Translate the following idiom from {source} culture to an equivalent in {target} culture.

Idiom: "{idiom}"

Respond with a single JSON object in exactly this format:
{{
  "translation": "The closest equivalent idiom in {target} culture",
  "literalTranslation": "The literal translation of the original idiom",
  "explanation": "Explanation of the meaning and how it relates to the original",
  "culturalNotes": ["Important cultural notes, usage guidelines or warnings"]
}}

If there is no clear equivalent, suggest the closest concept and explain the differences."#,
            source = source_culture,
            target = target_culture,
            idiom = idiom,
        );

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content("You are a linguistic expert specializing in cross-cultural idioms and expressions.")
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .temperature(0.7)
            .max_completion_tokens(500u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, client.chat().create(request))
            .await
            .map_err(|_| PortError::AnalysisUnavailable("Idiom translation timed out".to_string()))?
            .map_err(|e| PortError::AnalysisUnavailable(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::AnalysisUnavailable("No translation generated".to_string()))?;

        let record: TranslationRecord = serde_json::from_str(strip_code_fence(content.trim()))
            .map_err(|e| PortError::AnalysisUnavailable(format!("Malformed translation: {}", e)))?;

        Ok(IdiomTranslation {
            original_idiom: idiom.to_string(),
            translation: record.translation,
            literal_translation: record.literal_translation,
            explanation: record.explanation,
            cultural_notes: record.cultural_notes,
        })
    }
}

#[async_trait]
impl IdiomTranslator for OpenAiIdiomAdapter {
    async fn translate(
        &self,
        idiom: &str,
        source_culture: &str,
        target_culture: &str,
    ) -> IdiomTranslation {
        let Some(client) = &self.client else {
            return IdiomTranslation {
                original_idiom: idiom.to_string(),
                translation: "API key not configured. Translation unavailable.".to_string(),
                literal_translation: None,
                explanation: "Please configure the OpenAI API key to use this feature.".to_string(),
                cultural_notes: Vec::new(),
            };
        };

        match self
            .request_translation(client, idiom, source_culture, target_culture)
            .await
        {
            Ok(translation) => translation,
            Err(e) => {
                warn!("Error in idiom translation: {}", e);
                IdiomTranslation {
                    original_idiom: idiom.to_string(),
                    translation: "Error translating idiom. Please try again later.".to_string(),
                    literal_translation: None,
                    explanation: "An error occurred during translation.".to_string(),
                    cultural_notes: Vec::new(),
                }
            }
        }
    }
}
