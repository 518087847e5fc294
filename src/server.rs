//! HTTP front end for the pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/ingest/upload?name=<file.pdf>` | Ingest the raw PDF request body |
//! | `POST` | `/ingest/url` | Download `{ "url": ... }` and ingest it |
//! | `POST` | `/ask` | Answer `{ "question": ..., "max_output_tokens"?: ... }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "size_limit_exceeded", "message": "document is ... bytes" } }
//! ```
//!
//! | Error | Status |
//! |-------|--------|
//! | `size_limit_exceeded` | 413 |
//! | `document_format`, `bad_request` | 400 |
//! | `fetch_failed`, `upstream`, `response_format` | 502 |
//! | `config` | 500 |
//!
//! Ingestion requests are serialized: one document is processed at a time.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser page can
//! talk to the server directly.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use pdf_rag_core::models::QueryAnswer;
use pdf_rag_core::RagError;

use crate::ingest::IngestReport;
use crate::pipeline::Pipeline;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    ingest_lock: Arc<Mutex<()>>,
}

/// Serve `pipeline` on `bind` until Ctrl-C.
pub async fn run_server(bind: &str, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let app = build_router(pipeline);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");
    println!("Listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Build the router without binding, for embedding in other servers or tests.
pub fn build_router(pipeline: Arc<Pipeline>) -> Router {
    let body_limit = usize::try_from(pipeline.settings().max_bytes).unwrap_or(usize::MAX);

    let state = AppState {
        pipeline,
        ingest_lock: Arc::new(Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/ingest/upload", post(handle_upload))
        .route("/ingest/url", post(handle_ingest_url))
        .route("/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("interrupt received, shutting down");
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

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let status = match &err {
            RagError::SizeLimitExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RagError::DocumentFormat(_) | RagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RagError::Fetch(_) | RagError::Upstream(_) | RagError::ResponseFormat(_) => {
                StatusCode::BAD_GATEWAY
            }
            RagError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ingest/upload ============

#[derive(Deserialize)]
struct UploadParams {
    name: Option<String>,
}

/// The body extractor is taken as a `Result` so an over-limit body is
/// reported through the JSON error contract instead of axum's plain-text 413.
async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<IngestReport>, AppError> {
    let limit = state.pipeline.settings().max_bytes;
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if let Some(size) = declared.filter(|&size| size > limit) {
        return Err(RagError::SizeLimitExceeded { size, limit }.into());
    }
    let body = body.map_err(|rejection| upload_rejection(rejection, declared, limit))?;

    let name = params
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| bad_request("query parameter 'name' is required"))?;

    let _guard = state.ingest_lock.lock().await;
    let chunks = state.pipeline.ingest(body.to_vec(), &name).await?;

    Ok(Json(IngestReport {
        source_file: name.trim().to_string(),
        chunks,
    }))
}

fn upload_rejection(rejection: BytesRejection, declared: Option<u64>, limit: u64) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // Chunked bodies carry no length; all we know is that the cap was passed.
        let size = declared.unwrap_or(limit.saturating_add(1));
        return RagError::SizeLimitExceeded { size, limit }.into();
    }
    AppError {
        status: rejection.status(),
        code: "bad_request".to_string(),
        message: rejection.body_text(),
    }
}

// ============ POST /ingest/url ============

#[derive(Deserialize)]
struct IngestUrlRequest {
    url: String,
}

async fn handle_ingest_url(
    State(state): State<AppState>,
    Json(req): Json<IngestUrlRequest>,
) -> Result<Json<IngestReport>, AppError> {
    if req.url.trim().is_empty() {
        return Err(bad_request("url must not be empty"));
    }

    let _guard = state.ingest_lock.lock().await;
    let report = state.pipeline.ingest_url(req.url.trim()).await?;
    Ok(Json(report))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    max_output_tokens: Option<u32>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<QueryAnswer>, AppError> {
    let answer = state
        .pipeline
        .answer(&req.question, req.max_output_tokens)
        .await?;
    Ok(Json(answer))
}
