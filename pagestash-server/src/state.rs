use std::sync::Arc;

use pagestash_core::{PagestashConfig, QueryExecutor, SessionRegistry, StaticExecutor};

/// Everything a request handler needs. Cloning shares the same registry.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub executor: Arc<dyn QueryExecutor>,
    pub config: PagestashConfig,
}

impl AppState {
    pub fn new(config: PagestashConfig, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            registry: SessionRegistry::new(config.sessions.clone()),
            executor,
            config,
        }
    }

    /// State with no live database behind it.
    pub fn static_mode(config: PagestashConfig) -> Self {
        Self::new(config, Arc::new(StaticExecutor::unavailable()))
    }

    pub fn default_page_size(&self) -> i64 {
        self.config.sessions.default_page_size
    }
}
