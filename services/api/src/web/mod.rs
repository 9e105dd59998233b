pub mod consent;
pub mod feedback;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

pub use rest::{analyze_text_handler, health_handler, translate_idiom_handler, ApiDoc};
pub use state::AppState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Builds the API routes over the shared state. Request ids and tracing come from
/// [`with_request_tracing`]; CORS and the Swagger UI are added by the server binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/analysis/text", post(analyze_text_handler))
        .route("/analysis/translate-idiom", post(translate_idiom_handler))
        .route(
            "/consent",
            get(consent::get_consent_handler)
                .put(consent::update_consent_handler)
                .delete(consent::delete_consent_handler),
        )
        .route("/feedback", post(feedback::submit_feedback_handler))
        .with_state(state)
}

/// Issues `req-<uuid>` ids for requests that arrive without an `x-request-id`.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestIdFromUuid;

impl MakeRequestId for MakeRequestIdFromUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&format!("req-{}", Uuid::new_v4()))
            .ok()
            .map(RequestId::new)
    }
}

/// Tags every request with an `x-request-id` (kept when the client sent one),
/// traces it under that id and echoes the id on the response.
pub fn with_request_tracing(app: Router) -> Router {
    app.layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get(&REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestIdFromUuid))
}
