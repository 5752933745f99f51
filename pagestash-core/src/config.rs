use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::PagestashError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PagestashConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/pagestash.sock".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string. Absent means static mode.
    pub url: Option<String>,
    pub max_connections: u32,
    pub static_mode: bool,
    /// Upper bound on rows materialized for a single session.
    pub max_rows: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            static_mode: false,
            max_rows: 10_000,
        }
    }
}

impl DatabaseConfig {
    /// Connection string to use, or `None` when running without a live database.
    pub fn live_url(&self) -> Option<&str> {
        if self.static_mode {
            return None;
        }
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_seconds: u64,
    pub reap_interval_seconds: u64,
    pub default_page_size: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: 300,
            reap_interval_seconds: 60,
            default_page_size: 20,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// Reaper period. Never zero, so the ticker cannot spin.
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_seconds.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8767,
        }
    }
}

impl PagestashConfig {
    /// Load from a TOML file, then apply `PAGESTASH`-prefixed environment
    /// overrides and a plain `DATABASE_URL` if one is set.
    pub fn load(path: &str) -> Result<Self, PagestashError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("PAGESTASH").separator("__"))
            .build()?;
        let mut config: Self = s.try_deserialize()?;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                config.database.url = Some(url);
            }
        }
        Ok(config)
    }

    /// Parse a TOML document without touching the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self, PagestashError> {
        Ok(Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }
}
