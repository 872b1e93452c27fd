//! HTTP API server.
//!
//! Exposes the engine via a JSON HTTP API:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/ingest` | Ingest a document |
//! | `POST` | `/api/search` | Rank stored chunks against a query |
//! | `POST` | `/api/ask` | Answer a question (retrieval or direct) |
//! | `GET`  | `/api/status` | Provider connectivity + knowledge-base stats |
//!
//! # Error contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `provider_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::engine::{AskRequest, RagEngine};
use crate::error::EngineError;
use crate::models::{Answer, IngestReceipt, KnowledgeBaseStats, SearchHit};
use crate::status::{StatusMonitor, StatusReport};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RagEngine>,
    pub monitor: Arc<StatusMonitor>,
}

/// Build the API router. Separated from [`run_server`] so tests can drive
/// the routes without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ingest", post(handle_ingest))
        .route("/api/search", post(handle_search))
        .route("/api/ask", post(handle_ask))
        .route("/api/status", get(handle_status))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is terminated.
pub async fn run_server(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    tracing::info!(addr = bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(message) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "bad_request",
                message,
            },
            EngineError::Provider { .. } => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "provider_error",
                message: err.to_string(),
            },
            EngineError::CacheWrite(_) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal",
                message: err.to_string(),
            },
        }
    }
}

// ============ POST /api/ingest ============

async fn handle_ingest(
    State(state): State<AppState>,
    Json(input): Json<crate::models::DocumentInput>,
) -> Result<Json<IngestReceipt>, AppError> {
    let receipt = state.engine.ingest(input).await?;
    Ok(Json(receipt))
}

// ============ POST /api/search ============

#[derive(Deserialize)]
struct SearchBody {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    threshold: Option<f32>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, AppError> {
    let results = state
        .engine
        .search(&body.query, body.limit, body.threshold)
        .await?;
    Ok(Json(SearchResponse { results }))
}

// ============ POST /api/ask ============

#[derive(Deserialize)]
struct AskBody {
    question: String,
    #[serde(default = "default_use_retrieval")]
    use_retrieval: bool,
    #[serde(default)]
    context: Option<String>,
}

fn default_use_retrieval() -> bool {
    true
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(body): Json<AskBody>,
) -> Result<Json<Answer>, AppError> {
    let answer = state
        .engine
        .ask(AskRequest {
            question: body.question,
            use_retrieval: body.use_retrieval,
            context: body.context,
        })
        .await?;
    Ok(Json(answer))
}

// ============ GET /api/status ============

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    providers: StatusReport,
    knowledge_base: KnowledgeBaseStats,
    cached_embeddings: usize,
    capabilities: [&'static str; 4],
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let providers = state.monitor.status().await;
    let status = if providers.connected() {
        "ok"
    } else {
        "degraded"
    };

    Json(StatusResponse {
        status,
        providers,
        knowledge_base: state.engine.stats(),
        cached_embeddings: state.engine.cached_embeddings(),
        capabilities: ["ingest", "search", "ask", "status"],
    })
}
