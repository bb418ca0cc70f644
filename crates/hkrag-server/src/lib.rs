//! HTTP API over the query pipeline.
//!
//! - `GET /` liveness and mode
//! - `POST /query` answer a question
//! - `GET /health` store entry count, 503 without a usable store
//! - `GET /metrics`, `POST /metrics/reset`
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use hkrag_core::config::Settings;
use hkrag_core::types::{QueryRequest, QueryResponse};
use hkrag_pipeline::format::to_response;
use hkrag_pipeline::QueryPipeline;

pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};

pub const WELCOME_MESSAGE: &str = "HK Healthcare RAG API is running! 🏥";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(pipeline: QueryPipeline) -> Self {
        Self { pipeline: Arc::new(pipeline), metrics: Arc::new(Metrics::new()) }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub mode: String,
    pub metrics: String,
    pub health: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub documents: usize,
    pub timestamp: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/query", post(query_handler))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/reset", post(reset_metrics))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(settings: &Settings) -> Result<()> {
    let pipeline = QueryPipeline::from_settings(settings).await?;
    if !pipeline.is_grounded() {
        warn!("Serving in ungrounded mode; run hkrag-ingest to build the vector store");
    }
    let app = app_router(AppState::new(pipeline));
    let bind = settings.server.bind_addr();
    let addr: SocketAddr = bind.parse().with_context(|| format!("invalid bind address {bind}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("hkrag-server listening on http://{}", addr);
    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: WELCOME_MESSAGE.to_string(),
        mode: state.pipeline.mode().to_string(),
        metrics: "/metrics".to_string(),
        health: "/health".to_string(),
    })
}

async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| api_error(rejection.status(), &rejection.body_text()))?;
    let question = request.question.trim();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Question must not be empty"));
    }
    match state.pipeline.answer(question).await {
        Ok(answer) => {
            state.metrics.record_success(answer.latency);
            info!("Answered in {:.2}s with {} sources", answer.latency.as_secs_f64(), answer.sources.len());
            Ok(Json(to_response(&answer)))
        }
        Err(e) => {
            state.metrics.record_failure();
            error!("Query failed: {:#}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, &format!("Error processing query: {e}")))
        }
    }
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    match state.pipeline.document_count().await {
        Ok(Some(documents)) => Ok(Json(HealthResponse {
            status: "healthy".to_string(),
            documents,
            timestamp: Utc::now().to_rfc3339(),
        })),
        Ok(None) => Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "Service unhealthy")),
        Err(e) => {
            error!("Health check failed: {:#}", e);
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "Service unhealthy"))
        }
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn reset_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    state.metrics.reset();
    Json(state.metrics.snapshot())
}

fn api_error(status: StatusCode, detail: &str) -> ApiError {
    (status, Json(ErrorBody { detail: detail.to_string() }))
}
