//! Plain-text rendering of a `PageView`: a markdown table plus a navigation footer.

use crate::models::page::PageView;
use crate::models::row::{column_names, display_value};

/// Longest cell text emitted, in characters.
pub const MAX_CELL_CHARS: usize = 40;

const ELLIPSIS: &str = "...";

/// Table followed by the navigation footer.
pub fn render_page(view: &PageView) -> String {
    format!("{}\n\n{}", render_table(view), render_footer(view))
}

pub fn render_table(view: &PageView) -> String {
    if view.rows.is_empty() {
        return "*No results found*".to_string();
    }

    let columns = column_names(&view.rows);
    let mut table = String::new();

    table.push_str(&table_line(columns.iter().map(|c| format_cell(c))));
    table.push_str(&table_line(columns.iter().map(|_| "---".to_string())));
    for row in &view.rows {
        table.push_str(&table_line(columns.iter().map(|c| {
            row.get(c)
                .map(|v| format_cell(&display_value(v)))
                .unwrap_or_default()
        })));
    }

    table
}

pub fn render_footer(view: &PageView) -> String {
    let moves = view.available_moves();
    let available = if moves.is_empty() {
        "none".to_string()
    } else {
        moves.join(", ")
    };

    format!(
        "Page {} of {} ({} total rows) | Showing {} | Session: {} | Available: {}",
        view.page, view.total_pages, view.total_rows, view.showing, view.session_id, available
    )
}

/// Single-line, pipe-escaped cell text of at most `MAX_CELL_CHARS` characters.
///
/// Escapes count toward the limit and an escaped pipe is never split.
pub fn format_cell(raw: &str) -> String {
    let pieces: Vec<String> = raw
        .chars()
        .map(|c| match c {
            '\n' | '\r' => " ".to_string(),
            '|' => "\\|".to_string(),
            other => other.to_string(),
        })
        .collect();

    let width = |p: &String| p.chars().count();
    if pieces.iter().map(width).sum::<usize>() <= MAX_CELL_CHARS {
        return pieces.concat();
    }

    let budget = MAX_CELL_CHARS - ELLIPSIS.len();
    let mut out = String::new();
    let mut used = 0;
    for piece in &pieces {
        let w = width(piece);
        if used + w > budget {
            break;
        }
        out.push_str(piece);
        used += w;
    }
    out.push_str(ELLIPSIS);
    out
}

fn table_line<I>(cells: I) -> String
where
    I: Iterator<Item = String>,
{
    let cells: Vec<String> = cells.collect();
    format!("| {} |\n", cells.join(" | "))
}
