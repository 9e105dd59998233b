//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        analysis_llm::OpenAiAnalysisAdapter,
        db::DbAdapter,
        diagnostics::TracingDiagnosticLog,
        feedback_sink::{run_feedback_purge, DbFeedbackSink, LogFeedbackSink},
        idiom_llm::OpenAiIdiomAdapter,
    },
    config::{AnalyzerMode, Config, FeedbackSinkKind},
    error::ApiError,
    web::{router, with_request_tracing, ApiDoc, AppState, REQUEST_ID_HEADER},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::Router;
use cultural_ai_core::{
    ports::{CulturalAnalyzer, DiagnosticLog, FeedbackSink},
    AnalysisGate, ConsentLocks, FeedbackRelay, HeuristicAnalyzer,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_client = config.openai_api_key.as_ref().map(|key| {
        let mut openai_config = OpenAIConfig::new().with_api_key(key);
        if let Some(base) = &config.openai_api_base {
            openai_config = openai_config.with_api_base(base);
        }
        Client::with_config(openai_config)
    });
    if openai_client.is_none() {
        warn!("OPENAI_API_KEY is not set; analysis falls back to heuristics and idiom translation is unavailable");
    }

    let diagnostics: Arc<dyn DiagnosticLog> = Arc::new(TracingDiagnosticLog);

    let analyzer: Arc<dyn CulturalAnalyzer> = match config.analyzer_mode {
        AnalyzerMode::Provider => Arc::new(OpenAiAnalysisAdapter::new(
            openai_client.clone(),
            config.analysis_model.clone(),
            config.analysis_timeout,
            config.provider_fallback,
        )),
        AnalyzerMode::Heuristic => Arc::new(HeuristicAnalyzer::new()),
    };
    info!(mode = ?config.analyzer_mode, "Analyzer selected");

    let idioms = Arc::new(OpenAiIdiomAdapter::new(
        openai_client,
        config.analysis_model.clone(),
        config.analysis_timeout,
    ));

    let feedback_sink: Arc<dyn FeedbackSink> = match config.feedback_sink {
        FeedbackSinkKind::Log => Arc::new(LogFeedbackSink::new(diagnostics.clone(), config.retention)),
        FeedbackSinkKind::Database => {
            tokio::spawn(run_feedback_purge(
                db_adapter.clone(),
                config.retention,
                config.retention_purge_interval,
            ));
            Arc::new(DbFeedbackSink::new(db_adapter.clone(), config.retention))
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        gate: Arc::new(AnalysisGate::new(analyzer, config.retention, diagnostics)),
        consent_storage: db_adapter.clone(),
        consent_locks: Arc::new(ConsentLocks::new()),
        cultures: db_adapter,
        feedback: Arc::new(FeedbackRelay::new(feedback_sink)),
        idioms,
    });

    let allowed_origin = config
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ALLOWED_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static("x-user-id"),
            REQUEST_ID_HEADER,
        ])
        .expose_headers([REQUEST_ID_HEADER]);

    // --- 5. Create the Web Router ---
    let app = with_request_tracing(
        Router::new()
            .merge(router(app_state))
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())),
    )
    .layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
