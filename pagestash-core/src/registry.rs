//! Session registry: concurrency-safe store of paged result sets.
//!
//! Every map mutation (insert, delete, sweep) and every cursor move runs under
//! one registry-wide lock, so concurrent callers on the same session are
//! serialized and a sweep never observes a half-updated cursor.
//!
//! Reaper lifecycle:
//!   Stopped --create_session--> Running { generation }
//!   Running --sweep leaves map empty--> Stopped
//!   Running --shutdown--> Stopped
//!
//! The reaper state lives under the same lock as the map. A reaper task only
//! acts while the state still names its own generation, so a stale task left
//! over from before a shutdown or an empty-map stop exits on its next tick
//! instead of running alongside its replacement.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::models::page::PageView;
use crate::models::row::Row;
use crate::models::summary::{CreatedSession, SessionSummary};
use crate::paged::PagedResultSet;

const SESSION_ID_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    Stopped,
    Running { generation: u64 },
}

struct RegistryState {
    sessions: HashMap<String, PagedResultSet>,
    reaper: ReaperState,
    next_generation: u64,
}

struct Shared {
    state: Mutex<RegistryState>,
    config: SessionConfig,
    shutdown: broadcast::Sender<()>,
}

/// Cheap-to-clone handle; all clones share one session map.
#[derive(Clone)]
pub struct SessionRegistry {
    shared: Arc<Shared>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionRegistry {
    /// Empty registry with the reaper not yet started.
    pub fn new(config: SessionConfig) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RegistryState {
                    sessions: HashMap::new(),
                    reaper: ReaperState::Stopped,
                    next_generation: 0,
                }),
                config,
                shutdown,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Store `rows` behind a fresh id and return the first page.
    ///
    /// Never fails: the page size is clamped and an empty row set yields one
    /// empty page. Starts the reaper when called inside a Tokio runtime and
    /// no reaper is running.
    pub fn create_session(&self, query: &str, rows: Vec<Row>, page_size: i64) -> CreatedSession {
        let mut state = self.shared.state.lock();

        let session_id = loop {
            let candidate = new_session_id();
            if !state.sessions.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!("Session id collision on {}, regenerating", candidate);
        };

        let mut session = PagedResultSet::new(session_id.clone(), query, rows, page_size);
        let page = session.get_page(None);
        tracing::info!(
            "Session created: {} ({} rows, page size {})",
            session_id,
            session.total_rows(),
            session.page_size()
        );
        state.sessions.insert(session_id.clone(), session);

        self.ensure_reaper(&mut state);

        CreatedSession { session_id, page }
    }

    /// Summary of a live session. Does not count as access.
    pub fn get_session(&self, session_id: &str) -> Result<SessionSummary, SessionError> {
        let state = self.shared.state.lock();
        state
            .sessions
            .get(session_id)
            .map(|s| s.summary(Instant::now()))
            .ok_or_else(|| SessionError::not_found(session_id))
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.shared.state.lock().sessions.contains_key(session_id)
    }

    pub fn current_page(&self, session_id: &str) -> Result<PageView, SessionError> {
        self.with_session_mut(session_id, |s| s.get_page(None))
    }

    pub fn next_page(&self, session_id: &str) -> Result<PageView, SessionError> {
        self.with_session_mut(session_id, PagedResultSet::next_page)
    }

    pub fn prev_page(&self, session_id: &str) -> Result<PageView, SessionError> {
        self.with_session_mut(session_id, PagedResultSet::prev_page)
    }

    /// Jump to `page`, clamped into the session's page range.
    pub fn goto_page(&self, session_id: &str, page: i64) -> Result<PageView, SessionError> {
        self.with_session_mut(session_id, |s| s.get_page(Some(page)))
    }

    /// Returns whether a session with this id existed.
    pub fn delete_session(&self, session_id: &str) -> bool {
        let removed = self.shared.state.lock().sessions.remove(session_id).is_some();
        if removed {
            tracing::info!("Session deleted: {}", session_id);
        }
        removed
    }

    /// Active sessions, oldest first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let now = Instant::now();
        let state = self.shared.state.lock();
        let mut sessions: Vec<SessionSummary> =
            state.sessions.values().map(|s| s.summary(now)).collect();
        sessions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        sessions
    }

    pub fn active_sessions(&self) -> usize {
        self.shared.state.lock().sessions.len()
    }

    pub fn reaper_state(&self) -> ReaperState {
        self.shared.state.lock().reaper
    }

    /// Remove every session idle longer than the configured timeout.
    pub fn reap_expired(&self) -> usize {
        let mut state = self.shared.state.lock();
        sweep(&mut state.sessions, Instant::now(), self.shared.config.idle_timeout())
    }

    /// Stop the reaper and drop all sessions. The registry stays usable;
    /// the next `create_session` starts a fresh reaper.
    pub fn shutdown(&self) {
        let dropped = {
            let mut state = self.shared.state.lock();
            state.reaper = ReaperState::Stopped;
            let dropped = state.sessions.len();
            state.sessions.clear();
            // Reapers subscribe under this lock, so only those spawned before
            // this point can see the signal.
            let _ = self.shared.shutdown.send(());
            dropped
        };
        tracing::info!("Session registry shut down ({} sessions dropped)", dropped);
    }

    fn with_session_mut<F, R>(&self, session_id: &str, f: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut PagedResultSet) -> R,
    {
        let mut state = self.shared.state.lock();
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::not_found(session_id))?;
        Ok(f(session))
    }

    fn ensure_reaper(&self, state: &mut RegistryState) {
        if state.reaper != ReaperState::Stopped {
            return;
        }
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => {
                tracing::debug!("No Tokio runtime; session reaper not started");
                return;
            }
        };

        let generation = state.next_generation;
        state.next_generation += 1;
        state.reaper = ReaperState::Running { generation };

        handle.spawn(run_reaper(
            Arc::downgrade(&self.shared),
            generation,
            self.shared.config.reap_interval(),
            self.shared.shutdown.subscribe(),
        ));
    }
}

// ============================================================================
// REAPER
// ============================================================================

enum TickOutcome {
    Continue,
    Stop,
}

async fn run_reaper(
    shared: Weak<Shared>,
    generation: u64,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        "Session reaper started (generation {}, interval: {}s)",
        generation,
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(live) = shared.upgrade() else {
                    break;
                };
                if let TickOutcome::Stop = reap_tick(&live, generation) {
                    break;
                }
            }
            _ = shutdown.recv() => {
                let still_current = match shared.upgrade() {
                    Some(live) => {
                        let current = live.state.lock().reaper;
                        current == ReaperState::Running { generation }
                    }
                    None => false,
                };
                if still_current {
                    tracing::debug!("Session reaper {} ignoring a stale shutdown signal", generation);
                    continue;
                }
                tracing::debug!("Session reaper {} received shutdown", generation);
                break;
            }
        }
    }

    tracing::info!("Session reaper stopped (generation {})", generation);
}

fn reap_tick(shared: &Shared, generation: u64) -> TickOutcome {
    let mut state = shared.state.lock();
    if state.reaper != (ReaperState::Running { generation }) {
        return TickOutcome::Stop;
    }

    let reaped = sweep(&mut state.sessions, Instant::now(), shared.config.idle_timeout());
    if reaped > 0 {
        tracing::info!("Cleaned up {} expired sessions", reaped);
    }

    if state.sessions.is_empty() {
        state.reaper = ReaperState::Stopped;
        return TickOutcome::Stop;
    }
    TickOutcome::Continue
}

fn sweep(sessions: &mut HashMap<String, PagedResultSet>, now: Instant, timeout: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|id, session| {
        let keep = !session.is_expired(now, timeout);
        if !keep {
            tracing::info!("Session expired: {}", id);
        }
        keep
    });
    before - sessions.len()
}

fn new_session_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(SESSION_ID_LEN);
    id
}

// ============================================================================
// TESTS
// ============================================================================
