use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::PageView;

/// Result of creating a session: the new id plus its first page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub page: PageView,
}

/// Listing entry for an active session. Building one does not count as access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    /// Query text, shortened to 50 characters plus `...` when longer.
    pub query: String,
    pub total_rows: usize,
    pub page_size: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub created_at: DateTime<Utc>,
    pub age_seconds: u64,
    pub idle_seconds: u64,
}
