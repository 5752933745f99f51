//! Query executors: the inbound side that turns query text into rows.
//!
//! The registry never runs queries itself; servers hand it whatever an
//! executor returns. `PgExecutor` talks to a live Postgres pool inside a
//! read-only transaction. `StaticExecutor` stands in when no database is
//! configured and reports itself unavailable unless given fixture rows.

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row as _, TypeInfo, ValueRef};

use crate::error::ExecutorError;
use crate::models::row::Row;

const STATIC_MODE_MESSAGE: &str = "Database not configured. Running in static schema mode.";

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run read-only `query` and materialize its rows in result order.
    async fn fetch_rows(&self, query: &str) -> Result<Vec<Row>, ExecutorError>;

    /// Short backend description for health reporting.
    async fn health(&self) -> Result<String, ExecutorError>;
}

/// Reject anything that is not a SELECT statement.
pub fn ensure_read_only(query: &str) -> Result<(), ExecutorError> {
    let head: String = query.trim_start().chars().take(6).collect();
    if head.eq_ignore_ascii_case("SELECT") {
        Ok(())
    } else {
        Err(ExecutorError::ReadOnly)
    }
}

// ============================================================================
// Postgres
// ============================================================================

pub struct PgExecutor {
    pool: PgPool,
    max_rows: usize,
}

impl PgExecutor {
    pub fn new(pool: PgPool, max_rows: usize) -> Self {
        Self { pool, max_rows }
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn fetch_rows(&self, query: &str) -> Result<Vec<Row>, ExecutorError> {
        ensure_read_only(query)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut rows = Vec::new();
        let mut truncated = false;
        {
            let mut stream = sqlx::query(query).fetch(&mut *tx);
            while let Some(pg_row) = stream.try_next().await? {
                if rows.len() >= self.max_rows {
                    truncated = true;
                    break;
                }
                rows.push(decode_row(&pg_row));
            }
        }
        tx.rollback().await?;

        if truncated {
            tracing::warn!(
                "Query result truncated to {} rows: {}",
                self.max_rows,
                query
            );
        }
        tracing::debug!("Fetched {} rows", rows.len());
        Ok(rows)
    }

    async fn health(&self) -> Result<String, ExecutorError> {
        Ok(crate::db::health_check(&self.pool).await?)
    }
}

fn decode_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|col| {
            let value = decode_cell(row, col.ordinal(), col.type_info().name());
            (col.name().to_string(), value)
        })
        .collect()
}

/// Decode one cell to JSON. Types without a mapping render as `<TYPE>`.
fn decode_cell(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    let decoded: Result<Value, sqlx::Error> = match type_name {
        "BOOL" => row.try_get::<bool, _>(idx).map(Value::from),
        "INT2" => row.try_get::<i16, _>(idx).map(Value::from),
        "INT4" => row.try_get::<i32, _>(idx).map(Value::from),
        "INT8" => row.try_get::<i64, _>(idx).map(Value::from),
        "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| Value::from(f64::from(v))),
        "FLOAT8" => row.try_get::<f64, _>(idx).map(Value::from),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
            row.try_get::<String, _>(idx).map(Value::from)
        }
        "UUID" => row
            .try_get::<uuid::Uuid, _>(idx)
            .map(|v| Value::from(v.to_string())),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(|v| Value::from(v.to_string())),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(|v| Value::from(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(|v| Value::from(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| Value::from(v.to_rfc3339())),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx),
        other => return Value::from(format!("<{}>", other)),
    };

    decoded.unwrap_or_else(|e| {
        tracing::debug!("Cannot decode column {} as {}: {}", idx, type_name, e);
        Value::from(format!("<{}>", type_name))
    })
}

// ============================================================================
// Static mode
// ============================================================================

/// Executor used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticExecutor {
    fixture: Option<Vec<Row>>,
}

impl StaticExecutor {
    /// Always reports the database as unavailable.
    pub fn unavailable() -> Self {
        Self { fixture: None }
    }

    /// Answers every SELECT with a copy of `rows`.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            fixture: Some(rows),
        }
    }
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    async fn fetch_rows(&self, query: &str) -> Result<Vec<Row>, ExecutorError> {
        ensure_read_only(query)?;
        self.fixture
            .clone()
            .ok_or_else(|| ExecutorError::Unavailable(STATIC_MODE_MESSAGE.to_string()))
    }

    async fn health(&self) -> Result<String, ExecutorError> {
        match self.fixture {
            Some(ref rows) => Ok(format!("static fixture ({} rows)", rows.len())),
            None => Err(ExecutorError::Unavailable(STATIC_MODE_MESSAGE.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::row::row_from_pairs;
    use serde_json::json;

    #[test]
    fn test_ensure_read_only() {
        assert!(ensure_read_only("SELECT * FROM employee").is_ok());
        assert!(ensure_read_only("  select id from department").is_ok());
        assert!(ensure_read_only("\n\tSeLeCt 1").is_ok());
        assert!(matches!(ensure_read_only("DELETE FROM employee"), Err(ExecutorError::ReadOnly)));
        assert!(matches!(ensure_read_only("UPDATE x SET y = 1"), Err(ExecutorError::ReadOnly)));
        assert!(matches!(ensure_read_only(""), Err(ExecutorError::ReadOnly)));
        assert!(matches!(ensure_read_only("SEL"), Err(ExecutorError::ReadOnly)));
    }

    #[tokio::test]
    async fn test_static_unavailable() {
        let exec = StaticExecutor::unavailable();
        let err = exec.fetch_rows("SELECT 1").await.unwrap_err();
        assert!(matches!(err, ExecutorError::Unavailable(_)));
        assert!(err.to_string().contains("static schema mode"));
        assert!(exec.health().await.is_err());
    }

    #[tokio::test]
    async fn test_static_fixture_rows() {
        let rows = vec![
            row_from_pairs([("id", json!(1)), ("name", json!("Engineering"))]),
            row_from_pairs([("id", json!(2)), ("name", json!("HR"))]),
        ];
        let exec = StaticExecutor::with_rows(rows.clone());

        assert_eq!(exec.fetch_rows("SELECT * FROM department").await.unwrap(), rows);
        assert!(matches!(
            exec.fetch_rows("DROP TABLE department").await,
            Err(ExecutorError::ReadOnly)
        ));
        assert_eq!(exec.health().await.unwrap(), "static fixture (2 rows)");
    }
}
