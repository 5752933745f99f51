//! Pagestash HTTP REST API
//!
//! Axum-based HTTP server exposing session creation and page navigation.
//! Runs alongside the Unix socket IPC server on port 8767 (configurable).
//!
//! Each endpoint is a thin axum handler over a pure inner function, so the
//! inner functions can be tested without axum dispatch.
//!
//! Endpoints:
//! - GET    /health               executor and registry status
//! - GET    /version              server version info
//! - POST   /sessions             run a query (or take rows) and open a session
//! - GET    /sessions             list active sessions
//! - GET    /sessions/:id         session summary
//! - GET    /sessions/:id/page    current page
//! - POST   /sessions/:id/next    next page
//! - POST   /sessions/:id/prev    previous page
//! - POST   /sessions/:id/goto    jump to a page (clamped)
//! - DELETE /sessions/:id         drop a session

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use pagestash_core::ipc::PagestashRequest;
use pagestash_core::{ExecutorError, Row};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::router::{dispatch, RouteError};
use crate::state::AppState;

/// Build the Axum router with all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/sessions", post(create_session_handler).get(list_sessions_handler))
        .route(
            "/sessions/:id",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/:id/page", get(current_page_handler))
        .route("/sessions/:id/next", post(next_page_handler))
        .route("/sessions/:id/prev", post(prev_page_handler))
        .route("/sessions/:id/goto", post(goto_page_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(state: AppState, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Pagestash HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// Body of `POST /sessions`. With `rows` the rows are cached as given;
/// without, `query` is run through the executor first.
#[derive(Debug, Deserialize, Default)]
pub struct CreateSessionRequest {
    pub query: Option<String>,
    pub rows: Option<Vec<Row>>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GotoRequest {
    pub page: i64,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    Current,
    Next,
    Prev,
    Goto(i64),
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

pub async fn health_inner(state: &AppState) -> (StatusCode, serde_json::Value) {
    run(PagestashRequest::Health, state).await
}

/// Version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "pagestash/1",
    })
}

pub async fn create_session_inner(
    state: &AppState,
    req: CreateSessionRequest,
) -> (StatusCode, serde_json::Value) {
    let query = req.query.unwrap_or_default();
    let request = match req.rows {
        Some(rows) => PagestashRequest::CreateSession {
            query,
            rows,
            page_size: req.page_size,
        },
        None => PagestashRequest::Query {
            query,
            page_size: req.page_size,
        },
    };

    match dispatch(request, state).await {
        Ok(data) => (StatusCode::CREATED, data),
        Err(e) => error_body(&e),
    }
}

pub async fn list_sessions_inner(state: &AppState) -> (StatusCode, serde_json::Value) {
    run(PagestashRequest::ListSessions, state).await
}

pub async fn get_session_inner(state: &AppState, session_id: String) -> (StatusCode, serde_json::Value) {
    run(PagestashRequest::GetSession { session_id }, state).await
}

pub async fn page_inner(
    state: &AppState,
    session_id: String,
    movement: PageMove,
) -> (StatusCode, serde_json::Value) {
    let request = match movement {
        PageMove::Current => PagestashRequest::CurrentPage { session_id },
        PageMove::Next => PagestashRequest::NextPage { session_id },
        PageMove::Prev => PagestashRequest::PrevPage { session_id },
        PageMove::Goto(page) => PagestashRequest::GotoPage { session_id, page },
    };
    run(request, state).await
}

/// 200 when a session was removed, 404 when the id was unknown.
pub async fn delete_session_inner(state: &AppState, session_id: String) -> (StatusCode, serde_json::Value) {
    let (status, body) = run(PagestashRequest::DeleteSession { session_id }, state).await;
    if status == StatusCode::OK && body["deleted"] == false {
        return (StatusCode::NOT_FOUND, body);
    }
    (status, body)
}

// ============================================================================
// Axum handler wrappers (delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn create_session_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let (status, body) = create_session_inner(&state, req).await;
    (status, Json(body))
}

pub async fn list_sessions_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (status, body) = list_sessions_inner(&state).await;
    (status, Json(body))
}

pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = get_session_inner(&state, id).await;
    (status, Json(body))
}

pub async fn current_page_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = page_inner(&state, id, PageMove::Current).await;
    (status, Json(body))
}

pub async fn next_page_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = page_inner(&state, id, PageMove::Next).await;
    (status, Json(body))
}

pub async fn prev_page_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = page_inner(&state, id, PageMove::Prev).await;
    (status, Json(body))
}

pub async fn goto_page_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<GotoRequest>,
) -> impl IntoResponse {
    let (status, body) = page_inner(&state, id, PageMove::Goto(req.page)).await;
    (status, Json(body))
}

pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = delete_session_inner(&state, id).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

async fn run(request: PagestashRequest, state: &AppState) -> (StatusCode, serde_json::Value) {
    match dispatch(request, state).await {
        Ok(data) => (StatusCode::OK, data),
        Err(e) => error_body(&e),
    }
}

fn error_body(e: &RouteError) -> (StatusCode, serde_json::Value) {
    let body = serde_json::to_value(ErrorResponse::new(e.to_string()))
        .unwrap_or_else(|_| serde_json::json!({"status": "error"}));
    (error_status(e), body)
}

/// HTTP status for a routing failure.
pub fn error_status(e: &RouteError) -> StatusCode {
    match e {
        RouteError::Session(_) => StatusCode::NOT_FOUND,
        RouteError::BadRequest(_) => StatusCode::BAD_REQUEST,
        RouteError::Executor(ExecutorError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        RouteError::Executor(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
        RouteError::Executor(_) | RouteError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Unit Tests: inner functions called directly
// ============================================================================
