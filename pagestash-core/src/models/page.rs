use std::fmt;

use serde::{Deserialize, Serialize};

use super::row::Row;

/// Inclusive 1-based row range shown by a page. `0-0` for an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowingRange {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl fmt::Display for ShowingRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} of {}", self.start, self.end, self.total)
    }
}

/// Snapshot of one page of a session, safe to hand to any presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub session_id: String,
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    pub page_size: usize,
    pub showing: ShowingRange,
    pub rows: Vec<Row>,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageView {
    /// Navigation directions currently available, `next` before `prev`.
    pub fn available_moves(&self) -> Vec<&'static str> {
        let mut moves = Vec::with_capacity(2);
        if self.has_next {
            moves.push("next");
        }
        if self.has_prev {
            moves.push("prev");
        }
        moves
    }
}
