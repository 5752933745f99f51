use thiserror::Error;

/// Startup failures: loading configuration or connecting the pool.
#[derive(Error, Debug)]
pub enum PagestashError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Lookup failures reported by the session registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Unknown id, or the session was deleted or evicted. Callers re-run the query.
    #[error("Session {session_id} not found or expired")]
    NotFoundOrExpired { session_id: String },
}

impl SessionError {
    pub fn not_found(session_id: impl Into<String>) -> Self {
        Self::NotFoundOrExpired {
            session_id: session_id.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Query executor unavailable: {0}")]
    Unavailable(String),

    #[error("Only SELECT queries are allowed")]
    ReadOnly,

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),
}

impl ExecutorError {
    /// Failures caused by the query text rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ReadOnly | Self::Query(sqlx::Error::Database(_)))
    }
}
