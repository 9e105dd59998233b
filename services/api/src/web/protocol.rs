//! services/api/src/web/protocol.rs
//!
//! Request and response bodies of the REST API. Field names are camelCase on the
//! wire to match the mobile client.

use cultural_ai_core::domain::{
    ConsentKind, ConsentState, ConsentUpdate, ConsentValue, Finding, FindingReport,
    IdiomTranslation, TextOrigin,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Text Analysis
//=========================================================================================

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TextOriginDto {
    #[default]
    Mine,
    Theirs,
}

impl From<TextOriginDto> for TextOrigin {
    fn from(origin: TextOriginDto) -> Self {
        match origin {
            TextOriginDto::Mine => TextOrigin::Mine,
            TextOriginDto::Theirs => TextOrigin::Theirs,
        }
    }
}

/// The user's answer to the consent prompt, sent along with a resubmitted request.
#[derive(Deserialize, Debug, Clone, Copy, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsentAnswer {
    pub accepted: bool,
    #[serde(default)]
    pub ai_improvement: bool,
}

/// Missing fields deserialize as empty strings so that validation can report them.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeTextRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub culture_id: String,
    #[serde(default)]
    pub text_origin: TextOriginDto,
    #[serde(default)]
    pub consent: Option<ConsentAnswer>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindingDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idiom_id: Option<String>,
}

impl From<Finding> for FindingDto {
    fn from(finding: Finding) -> Self {
        Self {
            kind: finding.kind.as_str().to_string(),
            text: finding.excerpt,
            explanation: finding.explanation,
            suggestion: finding.suggestion,
            idiom_id: finding.related_idiom_id,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// Reference the client may quote when sending feedback about this result.
    pub analysis_id: Uuid,
    pub summary: String,
    pub issues: Vec<FindingDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
}

impl AnalysisResponse {
    pub fn new(analysis_id: Uuid, report: FindingReport) -> Self {
        Self {
            analysis_id,
            summary: report.summary,
            issues: report.issues.into_iter().map(FindingDto::from).collect(),
            alternatives: report.alternatives,
        }
    }
}

//=========================================================================================
// Idiom Translation
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateIdiomRequest {
    #[serde(default)]
    pub idiom: String,
    #[serde(default)]
    pub source_culture_id: String,
    #[serde(default)]
    pub target_culture_id: String,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdiomTranslationResponse {
    pub original_idiom: String,
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal_translation: Option<String>,
    pub explanation: String,
    pub cultural_notes: Vec<String>,
}

impl From<IdiomTranslation> for IdiomTranslationResponse {
    fn from(t: IdiomTranslation) -> Self {
        Self {
            original_idiom: t.original_idiom,
            translation: t.translation,
            literal_translation: t.literal_translation,
            explanation: t.explanation,
            cultural_notes: t.cultural_notes,
        }
    }
}

//=========================================================================================
// Consent
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ConsentKindDto {
    TextAnalysis,
    AiImprovement,
}

impl From<ConsentKindDto> for ConsentKind {
    fn from(kind: ConsentKindDto) -> Self {
        match kind {
            ConsentKindDto::TextAnalysis => ConsentKind::TextAnalysis,
            ConsentKindDto::AiImprovement => ConsentKind::AiImprovement,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConsentValueDto {
    Granted,
    Denied,
    Unset,
}

impl From<ConsentValue> for ConsentValueDto {
    fn from(value: ConsentValue) -> Self {
        match value {
            ConsentValue::Granted => ConsentValueDto::Granted,
            ConsentValue::Denied => ConsentValueDto::Denied,
            ConsentValue::Unset => ConsentValueDto::Unset,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsentStateResponse {
    pub text_analysis: ConsentValueDto,
    pub ai_improvement: ConsentValueDto,
}

impl From<ConsentState> for ConsentStateResponse {
    fn from(state: ConsentState) -> Self {
        Self {
            text_analysis: state.text_analysis.into(),
            ai_improvement: state.ai_improvement.into(),
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateConsentRequest {
    pub kind: ConsentKindDto,
    pub granted: bool,
}

/// The state after the write, plus the side effects the UI should mention.
#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConsentResponse {
    pub state: ConsentStateResponse,
    pub text_analysis_implied: bool,
    pub ai_improvement_revoked: bool,
}

impl UpdateConsentResponse {
    pub fn new(state: ConsentState, update: ConsentUpdate) -> Self {
        Self {
            state: state.into(),
            text_analysis_implied: update.text_analysis_implied,
            ai_improvement_revoked: update.ai_improvement_revoked,
        }
    }
}

//=========================================================================================
// Feedback
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub culture_id: Option<String>,
    #[serde(default)]
    pub feedback_type: String,
    #[serde(default)]
    pub feedback_text: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct FeedbackResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

//=========================================================================================
// Shared
//=========================================================================================

/// The body of every error response.
#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
