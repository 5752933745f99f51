//! Paged result set: cursor and pagination arithmetic over a fixed row sequence.
//!
//! Rows are frozen at creation and shared read-only; only the cursor and the
//! last-access timestamp move. Out-of-range page numbers clamp instead of
//! failing, so every call yields a valid `PageView`.
//!
//! Page math (1-indexed):
//!   total_pages = max(1, ceil(total_rows / page_size))
//!   page p holds rows[(p-1)*page_size .. min(p*page_size, total_rows)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::models::page::{PageView, ShowingRange};
use crate::models::row::Row;
use crate::models::summary::SessionSummary;

pub const MIN_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 50;
pub const DEFAULT_PAGE_SIZE: usize = 20;

const QUERY_PREVIEW_CHARS: usize = 50;

/// Clamp a requested page size into `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`.
pub fn clamp_page_size(requested: i64) -> usize {
    requested.clamp(MIN_PAGE_SIZE as i64, MAX_PAGE_SIZE as i64) as usize
}

#[derive(Debug, Clone)]
pub struct PagedResultSet {
    id: String,
    query: String,
    rows: Arc<[Row]>,
    page_size: usize,
    current_page: usize,
    created_at: DateTime<Utc>,
    created_instant: Instant,
    last_accessed: Instant,
}

impl PagedResultSet {
    pub fn new(id: impl Into<String>, query: impl Into<String>, rows: Vec<Row>, page_size: i64) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            query: query.into(),
            rows: rows.into(),
            page_size: clamp_page_size(page_size),
            current_page: 1,
            created_at: Utc::now(),
            created_instant: now,
            last_accessed: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn rows(&self) -> &Arc<[Row]> {
        &self.rows
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_rows().div_ceil(self.page_size).max(1)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// How long the session has gone without a page operation, as of `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed)
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.idle_for(now) > timeout
    }

    /// Move the cursor to `page` (clamped) if given, then report the current page.
    pub fn get_page(&mut self, page: Option<i64>) -> PageView {
        if let Some(requested) = page {
            self.current_page = requested.clamp(1, self.total_pages() as i64) as usize;
        }
        self.last_accessed = Instant::now();
        self.view()
    }

    pub fn next_page(&mut self) -> PageView {
        if self.current_page < self.total_pages() {
            self.current_page += 1;
        }
        self.get_page(None)
    }

    pub fn prev_page(&mut self) -> PageView {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
        self.get_page(None)
    }

    /// Listing snapshot. Does not touch the access timestamp.
    pub fn summary(&self, now: Instant) -> SessionSummary {
        let query = if self.query.chars().count() > QUERY_PREVIEW_CHARS {
            let head: String = self.query.chars().take(QUERY_PREVIEW_CHARS).collect();
            format!("{}...", head)
        } else {
            self.query.clone()
        };

        SessionSummary {
            session_id: self.id.clone(),
            query,
            total_rows: self.total_rows(),
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages(),
            created_at: self.created_at,
            age_seconds: now.saturating_duration_since(self.created_instant).as_secs(),
            idle_seconds: self.idle_for(now).as_secs(),
        }
    }

    fn view(&self) -> PageView {
        let total = self.total_rows();
        let start = ((self.current_page - 1) * self.page_size).min(total);
        let end = (start + self.page_size).min(total);
        let showing = if total == 0 {
            ShowingRange { start: 0, end: 0, total: 0 }
        } else {
            ShowingRange { start: start + 1, end, total }
        };

        PageView {
            session_id: self.id.clone(),
            page: self.current_page,
            total_pages: self.total_pages(),
            total_rows: total,
            page_size: self.page_size,
            showing,
            rows: self.rows[start..end].to_vec(),
            has_next: self.current_page < self.total_pages(),
            has_prev: self.current_page > 1,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
