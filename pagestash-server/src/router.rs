use pagestash_core::ipc::{PagestashRequest, PagestashResponse};
use pagestash_core::render::render_page;
use pagestash_core::{ExecutorError, PageView, ReaperState, SessionError};
use thiserror::Error;

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub async fn handle_request(request: PagestashRequest, state: &AppState) -> PagestashResponse {
    match dispatch(request, state).await {
        Ok(data) => PagestashResponse::ok(data),
        Err(e) => PagestashResponse::err(e.to_string()),
    }
}

/// Run one request against the registry and executor.
pub async fn dispatch(
    request: PagestashRequest,
    state: &AppState,
) -> Result<serde_json::Value, RouteError> {
    match request {
        PagestashRequest::Ping => Ok(serde_json::json!({"pong": true})),
        PagestashRequest::Health => Ok(health_report(state).await),
        PagestashRequest::Query { query, page_size } => {
            if query.trim().is_empty() {
                return Err(RouteError::BadRequest("query field is required".to_string()));
            }
            let rows = state.executor.fetch_rows(&query).await?;
            let created = state.registry.create_session(
                &query,
                rows,
                page_size.unwrap_or_else(|| state.default_page_size()),
            );
            page_payload(&created.page)
        }
        PagestashRequest::CreateSession {
            query,
            rows,
            page_size,
        } => {
            let created = state.registry.create_session(
                &query,
                rows,
                page_size.unwrap_or_else(|| state.default_page_size()),
            );
            page_payload(&created.page)
        }
        PagestashRequest::CurrentPage { session_id } => {
            page_payload(&state.registry.current_page(&session_id)?)
        }
        PagestashRequest::NextPage { session_id } => {
            page_payload(&state.registry.next_page(&session_id)?)
        }
        PagestashRequest::PrevPage { session_id } => {
            page_payload(&state.registry.prev_page(&session_id)?)
        }
        PagestashRequest::GotoPage { session_id, page } => {
            page_payload(&state.registry.goto_page(&session_id, page)?)
        }
        PagestashRequest::DeleteSession { session_id } => {
            let deleted = state.registry.delete_session(&session_id);
            Ok(serde_json::json!({
                "deleted": deleted,
                "session_id": session_id,
            }))
        }
        PagestashRequest::GetSession { session_id } => {
            let summary = state.registry.get_session(&session_id)?;
            Ok(serde_json::to_value(summary)?)
        }
        PagestashRequest::ListSessions => {
            let sessions = state.registry.list_sessions();
            Ok(serde_json::json!({
                "count": sessions.len(),
                "sessions": sessions,
            }))
        }
    }
}

/// The page view plus its rendered table and footer.
pub fn page_payload(view: &PageView) -> Result<serde_json::Value, RouteError> {
    let mut data = serde_json::to_value(view)?;
    if let Some(obj) = data.as_object_mut() {
        obj.insert("rendered".to_string(), serde_json::json!(render_page(view)));
    }
    Ok(data)
}

async fn health_report(state: &AppState) -> serde_json::Value {
    let database = match state.executor.health().await {
        Ok(v) => v,
        Err(e) => format!("unavailable: {}", e),
    };
    let reaper = match state.registry.reaper_state() {
        ReaperState::Running { .. } => "running",
        ReaperState::Stopped => "stopped",
    };

    serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "active_sessions": state.registry.active_sessions(),
        "reaper": reaper,
    })
}
