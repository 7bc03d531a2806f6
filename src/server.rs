//! HTTP JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/random` | A random sample of highlights |
//! | `GET`  | `/sources` | Distinct sources with type and count |
//! | `GET`  | `/source/{name}` | Every highlight of one source |
//! | `GET`  | `/search?q=…&limit=…` | Keyword search over the FTS index |
//! | `POST` | `/admin/upload` | Store line-delimited highlights for a source |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400, or 413 for an oversize upload), `internal` (500).
//! Malformed request bodies and query strings use the same contract.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::error::HighlightError;
use crate::ingest::{self, UploadOutcome};
use crate::models::{Highlight, SearchHit, Source};
use crate::store::HighlightStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: HighlightStore,
}

impl AppState {
    pub fn new(config: Config, store: HighlightStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = HighlightStore::open(config).await?;
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config.clone(), store));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route("/random", get(handle_random))
        .route("/sources", get(handle_sources))
        .route("/source/", get(handle_source_missing))
        .route("/source/{name}", get(handle_source))
        .route("/search", get(handle_search))
        .route(
            "/admin/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (`"bad_request"` or `"internal"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Extractor rejections keep the 413 for oversize bodies; everything else is a 400.
fn rejected(status: StatusCode, message: String) -> AppError {
    let status = if status == StatusCode::PAYLOAD_TOO_LARGE {
        status
    } else {
        StatusCode::BAD_REQUEST
    };
    AppError {
        status,
        code: "bad_request".to_string(),
        message,
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<HighlightError> for AppError {
    fn from(err: HighlightError) -> Self {
        if err.is_invalid_input() {
            bad_request(err.to_string())
        } else {
            // Details stay in the log; clients get a generic message.
            tracing::error!(error = %err, "request failed");
            internal("internal error")
        }
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

// ============ GET /random ============

#[derive(Serialize)]
struct HighlightsResponse {
    highlights: Vec<Highlight>,
}

async fn handle_random(State(state): State<AppState>) -> Result<Json<HighlightsResponse>, AppError> {
    let highlights = state
        .store
        .random(state.config.retrieval.random_limit)
        .await?;
    Ok(Json(HighlightsResponse { highlights }))
}

// ============ GET /sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<Source>,
}

async fn handle_sources(State(state): State<AppState>) -> Result<Json<SourcesResponse>, AppError> {
    let sources = state.store.sources().await?;
    Ok(Json(SourcesResponse { sources }))
}

// ============ GET /source/{name} ============

#[derive(Serialize)]
struct SourceHighlightsResponse {
    source: String,
    highlights: Vec<Highlight>,
}

async fn handle_source_missing() -> AppError {
    bad_request("source name must not be empty")
}

async fn handle_source(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SourceHighlightsResponse>, AppError> {
    if name.trim().is_empty() {
        return Err(bad_request("source name must not be empty"));
    }
    let highlights = state.store.by_source(&name).await?;
    Ok(Json(SourceHighlightsResponse {
        source: name,
        highlights,
    }))
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<i64>,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Query(params) = params?;
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| bad_request("query parameter 'q' is required"))?;

    let limit = params.limit.unwrap_or(state.config.retrieval.search_limit);
    if limit < 1 {
        return Err(bad_request("limit must be >= 1"));
    }

    let results = state.store.search(&query, limit).await?;
    Ok(Json(SearchResponse { query, results }))
}

// ============ POST /admin/upload ============

/// Upload body. Missing fields deserialize as empty and fail validation with a 400.
#[derive(Deserialize)]
struct UploadRequest {
    #[serde(default)]
    source_name: String,
    #[serde(default)]
    source_type: String,
    #[serde(default)]
    text: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    req: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadOutcome>, AppError> {
    let Json(req) = req?;
    let outcome = ingest::ingest_text(
        &state.store,
        &state.config,
        &req.source_name,
        &req.source_type,
        &req.text,
    )
    .await?;
    Ok(Json(outcome))
}
