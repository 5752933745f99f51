//! pagestash-cli: terminal client for the Pagestash HTTP API
//!
//! Runs a SELECT on the server, prints the first page, and leaves a session
//! behind that later invocations can page through by id.
//!
//! # Subcommands
//! - `query <sql> [--page-size N]`   run a query and open a session
//! - `show <id>`                     print the current page
//! - `next <id>` / `prev <id>`       move one page
//! - `goto <id> <page>`              jump to a page (clamped server-side)
//! - `delete <id>`                   drop a session
//! - `list`                          list active sessions
//! - `status`                        show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8767";
const QUERY_COLUMN_CHARS: usize = 50;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "pagestash-cli", version, about = "Page through cached SQL query results")]
struct Cli {
    /// Pagestash HTTP server URL (overrides PAGESTASH_HTTP_URL env var)
    #[arg(long, env = "PAGESTASH_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Print raw JSON instead of the rendered table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a SELECT and open a paginated session
    Query {
        /// SQL text (SELECT only)
        sql: String,

        /// Rows per page (clamped to 10..=50)
        #[arg(short = 'n', long)]
        page_size: Option<i64>,
    },

    /// Print the current page of a session
    Show { session_id: String },

    /// Advance one page
    Next { session_id: String },

    /// Go back one page
    Prev { session_id: String },

    /// Jump to a page
    Goto { session_id: String, page: i64 },

    /// Delete a session
    Delete { session_id: String },

    /// List active sessions
    List,

    /// Show Pagestash server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

/// Page payload returned by every navigation endpoint.
#[derive(Debug, Deserialize)]
pub struct PageResponse {
    pub session_id: String,
    pub page: i64,
    pub total_pages: i64,
    pub total_rows: usize,
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionEntry {
    pub session_id: String,
    pub query: String,
    pub total_rows: usize,
    pub current_page: i64,
    pub total_pages: i64,
    pub idle_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct SessionList {
    pub count: usize,
    pub sessions: Vec<SessionEntry>,
}

/// Server error body: `{"status": "error", "error": "..."}`
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Formatting
// ============================================================================

/// One line per session, as printed by `list`.
pub fn format_session_line(s: &SessionEntry) -> String {
    let query: String = if s.query.chars().count() > QUERY_COLUMN_CHARS {
        let head: String = s.query.chars().take(QUERY_COLUMN_CHARS).collect();
        format!("{}...", head)
    } else {
        s.query.clone()
    };
    format!(
        "{}  page {}/{}  {} rows  idle {}s  {}",
        s.session_id, s.current_page, s.total_pages, s.total_rows, s.idle_seconds, query
    )
}

/// Pull the server's error message out of a failed response body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?)
}

/// Send a request and return the JSON body, exiting on transport or API errors.
fn call(req: reqwest::blocking::RequestBuilder, url: &str) -> anyhow::Result<serde_json::Value> {
    let resp = match req.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("pagestash-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        eprintln!("pagestash-cli: {} ({})", error_message(&body), status);
        std::process::exit(1);
    }

    Ok(serde_json::from_str(&body)?)
}

fn print_page(body: serde_json::Value, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    let page: PageResponse = serde_json::from_value(body)?;
    println!("{}", page.rendered);
    Ok(())
}

fn do_query(server: &str, sql: &str, page_size: Option<i64>, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/sessions", server);
    let mut body = serde_json::json!({ "query": sql });
    if let Some(size) = page_size {
        body["page_size"] = serde_json::json!(size);
    }
    let resp = call(client()?.post(&url).json(&body), &url)?;
    print_page(resp, json_output)
}

fn do_move(server: &str, session_id: &str, action: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/sessions/{}/{}", server, session_id, action);
    let c = client()?;
    let req = if action == "page" { c.get(&url) } else { c.post(&url) };
    let resp = call(req, &url)?;
    print_page(resp, json_output)
}

fn do_goto(server: &str, session_id: &str, page: i64, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/sessions/{}/goto", server, session_id);
    let resp = call(client()?.post(&url).json(&serde_json::json!({ "page": page })), &url)?;
    print_page(resp, json_output)
}

fn do_delete(server: &str, session_id: &str) -> anyhow::Result<()> {
    let url = format!("{}/sessions/{}", server, session_id);
    call(client()?.delete(&url), &url)?;
    println!("Deleted session {}", session_id);
    Ok(())
}

fn do_list(server: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/sessions", server);
    let resp = call(client()?.get(&url), &url)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&resp)?);
        return Ok(());
    }

    let list: SessionList = serde_json::from_value(resp)?;
    if list.count == 0 {
        eprintln!("No active sessions");
        return Ok(());
    }
    for s in &list.sessions {
        println!("{}", format_session_line(s));
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client()?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Pagestash server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:          {}", body["version"].as_str().unwrap_or("?"));
            println!("Database:         {}", body["database"].as_str().unwrap_or("?"));
            println!("Sessions:         {}", body["active_sessions"].as_u64().unwrap_or(0));
            println!("Reaper:           {}", body["reaper"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("pagestash-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("pagestash-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();
    let json = cli.json;

    let result = match cli.command {
        Commands::Query { sql, page_size } => do_query(&server, &sql, page_size, json),
        Commands::Show { session_id } => do_move(&server, &session_id, "page", json),
        Commands::Next { session_id } => do_move(&server, &session_id, "next", json),
        Commands::Prev { session_id } => do_move(&server, &session_id, "prev", json),
        Commands::Goto { session_id, page } => do_goto(&server, &session_id, page, json),
        Commands::Delete { session_id } => do_delete(&server, &session_id),
        Commands::List => do_list(&server, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("pagestash-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn entry(query: &str) -> SessionEntry {
        SessionEntry {
            session_id: "a1b2c3d4e5f6".to_string(),
            query: query.to_string(),
            total_rows: 23,
            current_page: 2,
            total_pages: 2,
            idle_seconds: 14,
        }
    }

    // ========================================================================
    // TEST 1: clap definition is internally consistent
    // ========================================================================
    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    // ========================================================================
    // TEST 2: goto takes the id then the page
    // ========================================================================
    #[test]
    fn test_goto_args() {
        let cli = Cli::try_parse_from(["pagestash-cli", "goto", "abc", "7"]).unwrap();
        match cli.command {
            Commands::Goto { session_id, page } => {
                assert_eq!(session_id, "abc");
                assert_eq!(page, 7);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    // ========================================================================
    // TEST 3: --json is accepted after the subcommand
    // ========================================================================
    #[test]
    fn test_global_json_flag() {
        let cli = Cli::try_parse_from(["pagestash-cli", "list", "--json"]).unwrap();
        assert!(cli.json);
    }

    // ========================================================================
    // TEST 4: session line includes position and short query
    // ========================================================================
    #[test]
    fn test_session_line() {
        let line = format_session_line(&entry("SELECT * FROM employee"));
        assert_eq!(line, "a1b2c3d4e5f6  page 2/2  23 rows  idle 14s  SELECT * FROM employee");
    }

    // ========================================================================
    // TEST 5: long queries are cut to 50 chars plus "..."
    // ========================================================================
    #[test]
    fn test_session_line_truncates_query() {
        let query = format!("SELECT {} FROM employee", "x".repeat(80));
        let line = format_session_line(&entry(&query));
        let shown = line.rsplit("  ").next().unwrap();
        assert_eq!(shown.chars().count(), 53);
        assert!(shown.ends_with("..."));
    }

    // ========================================================================
    // TEST 6: error bodies yield the server message
    // ========================================================================
    #[test]
    fn test_error_message() {
        let body = r#"{"status":"error","error":"Session abc not found or expired"}"#;
        assert_eq!(error_message(body), "Session abc not found or expired");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    // ========================================================================
    // TEST 7: page payload decodes with the rendered text
    // ========================================================================
    #[test]
    fn test_page_response_decode() {
        let body = serde_json::json!({
            "session_id": "a1b2c3d4e5f6",
            "page": 1,
            "total_pages": 1,
            "total_rows": 0,
            "page_size": 20,
            "rows": [],
            "rendered": "*No results found*",
        });
        let page: PageResponse = serde_json::from_value(body).unwrap();
        assert_eq!(page.total_rows, 0);
        assert_eq!(page.rendered, "*No results found*");
    }
}
