use serde::{Deserialize, Serialize};

use crate::models::row::Row;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PagestashRequest {
    Ping,
    Health,
    /// Run `query` through the executor and open a session over its rows.
    Query {
        query: String,
        page_size: Option<i64>,
    },
    /// Open a session over rows the caller already holds.
    CreateSession {
        query: String,
        rows: Vec<Row>,
        page_size: Option<i64>,
    },
    CurrentPage {
        session_id: String,
    },
    NextPage {
        session_id: String,
    },
    PrevPage {
        session_id: String,
    },
    GotoPage {
        session_id: String,
        page: i64,
    },
    DeleteSession {
        session_id: String,
    },
    GetSession {
        session_id: String,
    },
    ListSessions,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PagestashResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl PagestashResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// MessagePack body of one IPC frame (named fields, so maps survive intact).
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(message)
}

pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}
