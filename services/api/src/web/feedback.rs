//! services/api/src/web/feedback.rs
//!
//! Handler for user feedback about an analysis. The text is anonymized before it
//! reaches the configured sink; the sender stays anonymous unless `x-user-id` is set.

use crate::web::protocol::{ErrorResponse, FeedbackRequest, FeedbackResponse};
use crate::web::rest::{optional_subject, HttpError};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use cultural_ai_core::domain::FeedbackSubmission;
use std::sync::Arc;

/// Report a problem with an analysis result (bias, inaccuracy, offensive content).
///
/// The text is anonymized before it leaves the server. `x-user-id` is optional;
/// without it the feedback is recorded as anonymous.
#[utoipa::path(
    post,
    path = "/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback accepted", body = FeedbackResponse),
        (status = 400, description = "Missing or unknown feedback type, or empty text", body = ErrorResponse),
        (status = 502, description = "The feedback sink failed", body = FeedbackResponse)
    ),
    params(("x-user-id" = Option<String>, Header, description = "Optional user id."))
)]
pub async fn submit_feedback_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>), HttpError> {
    let submission = FeedbackSubmission {
        analysis_id: body.analysis_id,
        culture_id: body.culture_id,
        kind: body.feedback_type,
        text: body.feedback_text,
        submitted_at: Utc::now(),
        user_id: optional_subject(&headers),
    };

    let receipt = state.feedback.submit(submission).await?;
    let status = if receipt.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    Ok((
        status,
        Json(FeedbackResponse {
            success: receipt.success,
            message: receipt.message,
        }),
    ))
}
