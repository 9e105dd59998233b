//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the analysis endpoints, the error response
//! mapping shared by every handler, and the master OpenAPI document.

use crate::web::protocol::{
    AnalysisResponse, AnalyzeTextRequest, ConsentAnswer, ConsentKindDto, ConsentStateResponse,
    ConsentValueDto, ErrorResponse, FeedbackRequest, FeedbackResponse, FindingDto,
    HealthResponse, IdiomTranslationResponse, TextOriginDto, TranslateIdiomRequest,
    UpdateConsentRequest, UpdateConsentResponse,
};
use crate::web::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use cultural_ai_core::{
    domain::{AnalysisRequest, PromptOutcome},
    ports::{ConsentPrompt, PortError, PortResult},
};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        analyze_text_handler,
        translate_idiom_handler,
        crate::web::consent::get_consent_handler,
        crate::web::consent::update_consent_handler,
        crate::web::consent::delete_consent_handler,
        crate::web::feedback::submit_feedback_handler,
    ),
    components(
        schemas(
            AnalyzeTextRequest, AnalysisResponse, FindingDto, TextOriginDto, ConsentAnswer,
            TranslateIdiomRequest, IdiomTranslationResponse,
            ConsentKindDto, ConsentValueDto, ConsentStateResponse, UpdateConsentRequest,
            UpdateConsentResponse, FeedbackRequest, FeedbackResponse, ErrorResponse,
            HealthResponse
        )
    ),
    tags(
        (name = "Cultural AI API", description = "Consent-gated cultural analysis of text, idiom translation and feedback.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Responses
//=========================================================================================

pub const USER_ID_HEADER: &str = "x-user-id";

/// An error as sent to the client: a status plus a `{ code, message }` body.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl HttpError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "validation_failed",
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PortError> for HttpError {
    fn from(e: PortError) -> Self {
        let (status, code) = match &e {
            PortError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
            PortError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            PortError::ConsentRequired => (StatusCode::PRECONDITION_REQUIRED, "consent_required"),
            PortError::ConsentDenied => (StatusCode::FORBIDDEN, "consent_denied"),
            PortError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "cancelled"),
            PortError::Unexpected(_)
            | PortError::AnalysisUnavailable(_)
            | PortError::Persistence(_) => {
                error!("Request failed: {}", e);
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal_error",
                    message: "An internal error occurred".to_string(),
                };
            }
        };
        Self {
            status,
            code,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Reads the consent subject from the `x-user-id` header.
pub fn required_subject(headers: &HeaderMap) -> Result<String, HttpError> {
    optional_subject(headers)
        .ok_or_else(|| HttpError::bad_request(format!("{} header is required", USER_ID_HEADER)))
}

pub fn optional_subject(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

//=========================================================================================
// Request-Scoped Consent Prompt
//=========================================================================================

/// Answers the gate's consent prompt with whatever the client sent along with the
/// request. Without an answer the client has to show its own prompt and resubmit.
struct RequestConsentPrompt {
    answer: Option<ConsentAnswer>,
}

#[async_trait]
impl ConsentPrompt for RequestConsentPrompt {
    async fn show_consent_prompt(&self) -> PortResult<PromptOutcome> {
        match self.answer {
            Some(ConsentAnswer {
                accepted: true,
                ai_improvement,
            }) => Ok(PromptOutcome::Accepted { ai_improvement }),
            Some(ConsentAnswer { accepted: false, .. }) => Ok(PromptOutcome::Declined),
            None => Err(PortError::ConsentRequired),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Analyze a piece of text for cultural appropriateness.
///
/// Requires text-analysis consent for the subject in `x-user-id`. When consent has
/// never been given the server answers 428; the client then shows its consent
/// prompt and resubmits with the `consent` answer. The text is never stored.
#[utoipa::path(
    post,
    path = "/analysis/text",
    request_body = AnalyzeTextRequest,
    responses(
        (status = 200, description = "Analysis report", body = AnalysisResponse),
        (status = 400, description = "Missing header or field", body = ErrorResponse),
        (status = 403, description = "Consent declined", body = ErrorResponse),
        (status = 404, description = "Unknown culture", body = ErrorResponse),
        (status = 428, description = "Consent prompt must be answered", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The consent subject (device or user id).")
    )
)]
pub async fn analyze_text_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalysisResponse>, HttpError> {
    let subject = required_subject(&headers)?;

    let request = AnalysisRequest::new(body.text, body.culture_id, body.text_origin.into());
    if let Some(field) = request.missing_field() {
        return Err(HttpError::bad_request(format!("{} is required", field)));
    }

    let culture_name = state.cultures.culture_name(&request.culture_id).await?;

    let consent = state.consent_for(&subject).await;
    let prompt = RequestConsentPrompt {
        answer: body.consent,
    };
    let report = state
        .gate
        .run(&consent, &prompt, request, &culture_name)
        .await?;

    let analysis_id = Uuid::new_v4();
    info!(%analysis_id, issues = report.issues.len(), "Analysis completed");
    Ok(Json(AnalysisResponse::new(analysis_id, report)))
}

/// Translate an idiom into its closest equivalent in another culture.
#[utoipa::path(
    post,
    path = "/analysis/translate-idiom",
    request_body = TranslateIdiomRequest,
    responses(
        (status = 200, description = "Translation (or a fixed unavailable answer)", body = IdiomTranslationResponse),
        (status = 400, description = "Missing field", body = ErrorResponse),
        (status = 404, description = "Unknown culture", body = ErrorResponse)
    )
)]
pub async fn translate_idiom_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TranslateIdiomRequest>,
) -> Result<Json<IdiomTranslationResponse>, HttpError> {
    if body.idiom.trim().is_empty()
        || body.source_culture_id.trim().is_empty()
        || body.target_culture_id.trim().is_empty()
    {
        return Err(HttpError::bad_request(
            "Idiom, source culture, and target culture are required",
        ));
    }

    let source = state.cultures.culture_name(&body.source_culture_id).await?;
    let target = state.cultures.culture_name(&body.target_culture_id).await?;

    let translation = state.idioms.translate(body.idiom.trim(), &source, &target).await;
    Ok(Json(translation.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_statuses() {
        let cases = [
            (PortError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PortError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PortError::ConsentRequired, StatusCode::PRECONDITION_REQUIRED),
            (PortError::ConsentDenied, StatusCode::FORBIDDEN),
            (PortError::Cancelled, StatusCode::REQUEST_TIMEOUT),
            (PortError::Persistence("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(HttpError::from(error).status(), status);
        }
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let error = HttpError::from(PortError::Unexpected("password=hunter2".into()));
        assert!(!error.message.contains("hunter2"));
    }

    #[tokio::test]
    async fn prompt_answers_come_from_the_request() {
        let accepted = RequestConsentPrompt {
            answer: Some(ConsentAnswer {
                accepted: true,
                ai_improvement: true,
            }),
        };
        assert_eq!(
            accepted.show_consent_prompt().await.unwrap(),
            PromptOutcome::Accepted {
                ai_improvement: true
            }
        );

        let missing = RequestConsentPrompt { answer: None };
        assert!(matches!(
            missing.show_consent_prompt().await,
            Err(PortError::ConsentRequired)
        ));
    }
}
