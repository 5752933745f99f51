pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod ipc;
pub mod models;
pub mod paged;
pub mod registry;
pub mod render;

pub use config::PagestashConfig;
pub use error::{ExecutorError, PagestashError, SessionError};
pub use executor::{PgExecutor, QueryExecutor, StaticExecutor};
pub use models::page::{PageView, ShowingRange};
pub use models::row::Row;
pub use models::summary::{CreatedSession, SessionSummary};
pub use paged::{PagedResultSet, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
pub use registry::{ReaperState, SessionRegistry};
