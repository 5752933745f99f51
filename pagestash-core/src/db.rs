use crate::config::DatabaseConfig;
use crate::error::PagestashError;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Connect a pool when the config names a live database.
pub async fn create_pool(config: &DatabaseConfig) -> Result<Option<PgPool>, PagestashError> {
    let Some(url) = config.live_url() else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(url)
        .await?;
    Ok(Some(pool))
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}
