//! HTTP integration tests for the Pagestash REST API
//!
//! Drives the full axum router with `oneshot` requests against a fixture
//! executor, so no database is needed.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pagestash_core::models::row::row_from_pairs;
use pagestash_core::{PagestashConfig, Row, StaticExecutor};
use pagestash_server::http::build_router;
use pagestash_server::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn employees(n: usize) -> Vec<Row> {
    (1..=n)
        .map(|i| {
            row_from_pairs([
                ("id", json!(i)),
                ("name", json!(format!("Employee {}", i))),
                ("email", json!(format!("employee{}@org.com", i))),
            ])
        })
        .collect()
}

fn make_state(rows: usize) -> AppState {
    AppState::new(
        PagestashConfig::default(),
        Arc::new(StaticExecutor::with_rows(employees(rows))),
    )
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ===========================================================================
// TEST 1: GET /version
// ===========================================================================
#[tokio::test]
async fn test_version_endpoint() {
    let app = build_router(make_state(0));
    let (status, body) = send(&app, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
    assert_eq!(body["protocol"], "pagestash/1");
}

// ===========================================================================
// TEST 2: GET /health
// ===========================================================================
#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(make_state(7));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "static fixture (7 rows)");
    assert_eq!(body["active_sessions"], 0);
}

// ===========================================================================
// TEST 3: 23 employees at 20 per page, forward and back
// ===========================================================================
#[tokio::test]
async fn test_employee_pagination_flow() {
    let app = build_router(make_state(23));

    let (status, first) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"query": "SELECT * FROM employee", "page_size": 20})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{:?}", first);
    assert_eq!(first["page"], 1);
    assert_eq!(first["total_pages"], 2);
    assert_eq!(first["rows"].as_array().unwrap().len(), 20);
    assert_eq!(first["has_next"], true);
    assert_eq!(first["has_prev"], false);

    let id = first["session_id"].as_str().unwrap().to_string();
    let rendered = first["rendered"].as_str().unwrap();
    assert!(rendered.starts_with("| id | name | email |"));
    assert!(rendered.contains(&format!("Session: {}", id)));

    let (status, second) = send(&app, "POST", &format!("/sessions/{}/next", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["page"], 2);
    let ids: Vec<u64> = second["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![21, 22, 23]);
    assert_eq!(second["has_next"], false);
    assert_eq!(second["has_prev"], true);

    let (_, stay) = send(&app, "POST", &format!("/sessions/{}/next", id), None).await;
    assert_eq!(stay["page"], 2);

    let (_, back) = send(&app, "POST", &format!("/sessions/{}/prev", id), None).await;
    assert_eq!(back["page"], 1);

    let (_, current) = send(&app, "GET", &format!("/sessions/{}/page", id), None).await;
    assert_eq!(current["page"], 1);
}

// ===========================================================================
// TEST 4: goto clamps out-of-range pages
// ===========================================================================
#[tokio::test]
async fn test_goto_clamps() {
    let app = build_router(make_state(95));
    let (_, created) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"query": "SELECT * FROM employee", "page_size": 10})),
    )
    .await;
    let id = created["session_id"].as_str().unwrap().to_string();

    let (status, far) = send(&app, "POST", &format!("/sessions/{}/goto", id), Some(json!({"page": 9999}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(far["page"], 10);
    assert_eq!(far["showing"]["start"], 91);
    assert_eq!(far["showing"]["end"], 95);

    let (_, near) = send(&app, "POST", &format!("/sessions/{}/goto", id), Some(json!({"page": -5}))).await;
    assert_eq!(near["page"], 1);
}

// ===========================================================================
// TEST 5: empty result set is a single empty page
// ===========================================================================
#[tokio::test]
async fn test_empty_result_session() {
    let app = build_router(make_state(0));
    let (status, body) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"query": "SELECT * FROM employee WHERE false", "page_size": 20})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_rows"], 0);
    assert_eq!(body["total_pages"], 1);
    assert!(body["rows"].as_array().unwrap().is_empty());
    assert_eq!(body["has_next"], false);
    assert_eq!(body["has_prev"], false);
    assert!(body["rendered"].as_str().unwrap().starts_with("*No results found*"));
}

// ===========================================================================
// TEST 6: session lifecycle: get, list, delete, then 404
// ===========================================================================
#[tokio::test]
async fn test_session_lifecycle() {
    let app = build_router(make_state(0));
    let (_, created) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"query": "SELECT * FROM department", "rows": employees(12)})),
    )
    .await;
    let id = created["session_id"].as_str().unwrap().to_string();
    assert_eq!(created["page_size"], 20, "default page size applies");

    let (status, summary) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["query"], "SELECT * FROM department");
    assert_eq!(summary["total_rows"], 12);

    let (_, listed) = send(&app, "GET", "/sessions", None).await;
    assert_eq!(listed["count"], 1);

    let (status, deleted) = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], true);

    let (status, again) = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(again["deleted"], false);

    let (status, gone) = send(&app, "POST", &format!("/sessions/{}/next", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(gone["status"], "error");
}

// ===========================================================================
// TEST 7: write statements are refused
// ===========================================================================
#[tokio::test]
async fn test_write_query_rejected() {
    let app = build_router(make_state(3));
    let (status, body) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"query": "DELETE FROM employee"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only SELECT queries are allowed");
}

// ===========================================================================
// TEST 8: idle sessions expire and report 404 afterwards
// ===========================================================================
#[tokio::test(start_paused = true)]
async fn test_idle_session_expires() {
    let state = make_state(30);
    let app = build_router(state.clone());

    let (_, created) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"query": "SELECT * FROM employee"})),
    )
    .await;
    let id = created["session_id"].as_str().unwrap().to_string();

    // Default timeout 300s, reaper every 60s: the tick at 360s evicts it.
    tokio::time::sleep(Duration::from_secs(361)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(state.registry.active_sessions(), 0);
    let (status, body) = send(&app, "POST", &format!("/sessions/{}/next", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found or expired"));
}
