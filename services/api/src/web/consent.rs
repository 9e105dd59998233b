//! services/api/src/web/consent.rs
//!
//! Handlers for reading and changing the consent flags of a subject.

use crate::web::protocol::{ConsentStateResponse, ErrorResponse, UpdateConsentRequest, UpdateConsentResponse};
use crate::web::rest::{required_subject, HttpError};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
};
use std::sync::Arc;
use tracing::info;

/// Current consent state for the subject.
#[utoipa::path(
    get,
    path = "/consent",
    responses(
        (status = 200, description = "Consent state", body = ConsentStateResponse),
        (status = 400, description = "Missing x-user-id header", body = ErrorResponse)
    ),
    params(("x-user-id" = String, Header, description = "The consent subject."))
)]
pub async fn get_consent_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ConsentStateResponse>, HttpError> {
    let subject = required_subject(&headers)?;
    let consent = state.consent_for(&subject).await;
    Ok(Json(consent.state().await.into()))
}

/// Grant or withdraw one consent flag.
///
/// Granting AI improvement also grants text analysis; withdrawing text analysis
/// also withdraws AI improvement. Both side effects are reported.
#[utoipa::path(
    put,
    path = "/consent",
    request_body = UpdateConsentRequest,
    responses(
        (status = 200, description = "State after the change", body = UpdateConsentResponse),
        (status = 400, description = "Missing x-user-id header", body = ErrorResponse)
    ),
    params(("x-user-id" = String, Header, description = "The consent subject."))
)]
pub async fn update_consent_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateConsentRequest>,
) -> Result<Json<UpdateConsentResponse>, HttpError> {
    let subject = required_subject(&headers)?;
    let consent = state.consent_for(&subject).await;

    let update = consent.set(body.kind.into(), body.granted).await;
    let current = consent.state().await;
    info!(kind = ?body.kind, granted = body.granted, "Consent updated");

    Ok(Json(UpdateConsentResponse::new(current, update)))
}

/// Forget both consent flags (account or data deletion).
#[utoipa::path(
    delete,
    path = "/consent",
    responses(
        (status = 200, description = "Consent cleared", body = ConsentStateResponse),
        (status = 400, description = "Missing x-user-id header", body = ErrorResponse)
    ),
    params(("x-user-id" = String, Header, description = "The consent subject."))
)]
pub async fn delete_consent_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ConsentStateResponse>, HttpError> {
    let subject = required_subject(&headers)?;
    let consent = state.consent_for(&subject).await;
    consent.reset().await;
    Ok(Json(consent.state().await.into()))
}
