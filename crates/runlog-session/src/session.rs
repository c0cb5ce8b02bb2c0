//! Session lifecycle: binds one task at a time, seeds the buffer from
//! history, pages backward on demand, and exposes the viewer surface.
//!
//! All mutable state lives in one mutex-guarded [`SessionState`]; the
//! in-flight booleans serialize fetches per direction, and an epoch
//! counter invalidates results that arrive after the session has been
//! rebound to another task.

use std::sync::Arc;
use std::time::Duration;

use runlog_core::limits::BufferLimits;
use runlog_core::types::{HistoryPage, TaskId};
use tokio::sync::Mutex;

use crate::buffer::LogBuffer;
use crate::cursor::{self, Cursors};
use crate::error::SessionError;
use crate::poller::{self, PollerHandle};
use crate::source::{LogSource, SourceError};

// ─── Config ───────────────────────────────────────────────────────

/// Tuning knobs for a sync session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Cadence of the tail poll loop.
    pub poll_interval: Duration,
    /// Ceiling for any single fetch; a hung fetch must not block the
    /// poll direction forever.
    pub fetch_timeout: Duration,
    /// Lines per seed / history page.
    pub page_lines: u32,
    /// Buffer trimming policy.
    pub limits: BufferLimits,
}

impl SyncConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

    /// Config for a given poll cadence; the fetch timeout tracks it at 2x.
    pub fn for_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            fetch_timeout: poll_interval * 2,
            page_lines: 50,
            limits: BufferLimits::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::for_interval(Self::DEFAULT_POLL_INTERVAL)
    }
}

// ─── State ────────────────────────────────────────────────────────

/// Mutable session state, guarded by one mutex.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) task: Option<TaskId>,
    pub(crate) buffer: LogBuffer,
    pub(crate) cursors: Cursors,
    pub(crate) has_more_history: bool,
    pub(crate) is_polling: bool,
    pub(crate) in_flight_tail: bool,
    pub(crate) in_flight_history: bool,
    /// Bumped on every rebind; a fetch result whose snapshot epoch no
    /// longer matches is discarded on arrival.
    pub(crate) epoch: u64,
    pub(crate) last_error: Option<String>,
}

impl SessionState {
    pub(crate) fn new(limits: BufferLimits) -> Self {
        Self {
            task: None,
            buffer: LogBuffer::new(limits),
            cursors: Cursors::new(),
            has_more_history: false,
            is_polling: false,
            in_flight_tail: false,
            in_flight_history: false,
            epoch: 0,
            last_error: None,
        }
    }
}

/// Read-only snapshot of the session for a display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub content: String,
    pub can_load_older: bool,
    pub is_polling: bool,
    pub is_fetching_history: bool,
    pub last_error: Option<String>,
}

// ─── Session ──────────────────────────────────────────────────────

/// One viewer-side sync session over a [`LogSource`].
pub struct LogSync<S> {
    source: Arc<S>,
    config: SyncConfig,
    state: Arc<Mutex<SessionState>>,
    poller: Mutex<Option<PollerHandle>>,
}

impl<S: LogSource + 'static> LogSync<S> {
    pub fn new(source: Arc<S>, config: SyncConfig) -> Self {
        let state = SessionState::new(config.limits.clone());
        Self {
            source,
            config,
            state: Arc::new(Mutex::new(state)),
            poller: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    /// Snapshot the viewer surface.
    pub async fn snapshot(&self) -> ViewState {
        let st = self.state.lock().await;
        ViewState {
            content: st.buffer.as_str().to_string(),
            can_load_older: st.has_more_history,
            is_polling: st.is_polling,
            is_fetching_history: st.in_flight_history,
            last_error: st.last_error.clone(),
        }
    }

    // ─── Lifecycle ────────────────────────────────────────────────

    /// Bind the session to `task` (or unbind with `None`).
    ///
    /// Re-selecting the bound task is a no-op. Otherwise the session is
    /// reset, results of fetches already in flight are invalidated via
    /// the epoch bump, and a non-null binding is seeded from the most
    /// recent page of history. The poll loop reads the binding through
    /// the shared state each tick, so an active poller retargets
    /// without being restarted.
    pub async fn select_task(&self, task: Option<TaskId>) -> Result<(), SessionError> {
        {
            let mut st = self.state.lock().await;
            if st.task == task {
                return Ok(());
            }
            st.epoch += 1;
            st.task = task;
            st.buffer.clear();
            st.cursors.reset();
            st.has_more_history = false;
            // In-flight flags belong to the dead epoch; stale arrivals
            // are discarded without touching them.
            st.in_flight_tail = false;
            st.in_flight_history = false;
            st.last_error = None;
        }
        if task.is_some() {
            self.load_latest(self.config.page_lines).await?;
        }
        Ok(())
    }

    /// Clear the source-side log, then reset local cursors and buffer.
    /// The task stays bound and polling keeps running. A failed clear
    /// leaves the session untouched — it must not look like a success.
    pub async fn clear(&self) -> Result<(), SessionError> {
        let (task, epoch) = {
            let st = self.state.lock().await;
            let Some(task) = st.task else {
                return Ok(());
            };
            (task, st.epoch)
        };

        let source = Arc::clone(&self.source);
        let result =
            fetch_with_timeout(self.config.fetch_timeout, move || source.clear_log(task)).await;

        let mut st = self.state.lock().await;
        if st.epoch != epoch {
            return Ok(());
        }
        match result {
            Ok(()) => {
                st.cursors.reset();
                st.buffer.clear();
                st.has_more_history = false;
                st.last_error = None;
                Ok(())
            }
            Err(e) => {
                let e = match e {
                    SessionError::FetchFailed(src) => SessionError::ClearFailed(src),
                    other => other,
                };
                st.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ─── History pager ────────────────────────────────────────────

    /// Seed the buffer with the most recent `limit_lines` lines and
    /// initialize both cursors from the result. Replaces the buffer.
    pub async fn load_latest(&self, limit_lines: u32) -> Result<(), SessionError> {
        let (task, epoch) = {
            let mut st = self.state.lock().await;
            let Some(task) = st.task else {
                return Ok(());
            };
            if st.in_flight_history {
                // At most one history fetch at a time; dropped, not queued.
                return Ok(());
            }
            st.in_flight_history = true;
            (task, st.epoch)
        };

        let source = Arc::clone(&self.source);
        let result = fetch_with_timeout(self.config.fetch_timeout, move || {
            source.read_history(task, 0, limit_lines)
        })
        .await;

        let mut st = self.state.lock().await;
        if st.epoch != epoch {
            return Ok(());
        }
        st.in_flight_history = false;
        match result.and_then(|page| apply_seed(&mut st, page)) {
            Ok(()) => {
                st.last_error = None;
                Ok(())
            }
            Err(e) => {
                st.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Prepend one page of older content, walking the history cursor
    /// toward the start of the log. No-op if nothing is bound, no older
    /// content remains, or a history fetch is already in flight.
    pub async fn load_previous(&self, limit_lines: u32) -> Result<(), SessionError> {
        let (task, before, epoch) = {
            let mut st = self.state.lock().await;
            let Some(task) = st.task else {
                return Ok(());
            };
            if !st.has_more_history || st.in_flight_history {
                return Ok(());
            }
            st.in_flight_history = true;
            (task, st.cursors.history(), st.epoch)
        };

        let source = Arc::clone(&self.source);
        let result = fetch_with_timeout(self.config.fetch_timeout, move || {
            source.read_history(task, before, limit_lines)
        })
        .await;

        let mut st = self.state.lock().await;
        if st.epoch != epoch {
            return Ok(());
        }
        st.in_flight_history = false;
        match result.and_then(|page| apply_history(&mut st, page)) {
            Ok(()) => {
                st.last_error = None;
                Ok(())
            }
            Err(e) => {
                // has_more_history keeps its last known value so the
                // viewer can retry.
                st.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ─── Poll scheduler surface ───────────────────────────────────

    /// One immediate tail fetch outside the timer cadence.
    pub async fn refresh_now(&self) -> Result<(), SessionError> {
        poller::poll_tick(&self.source, &self.state, &self.config).await
    }

    /// Arm the poll loop. No-op if already polling. The first fetch
    /// fires immediately, then every `poll_interval`.
    pub async fn start_polling(&self) {
        let mut poller = self.poller.lock().await;
        if poller.is_some() {
            return;
        }
        self.state.lock().await.is_polling = true;
        *poller = Some(poller::spawn(
            Arc::clone(&self.source),
            Arc::clone(&self.state),
            self.config.clone(),
        ));
    }

    /// Disarm the poll loop. A tick already in flight completes and its
    /// result is still applied; only new ticks stop.
    pub async fn stop_polling(&self) {
        let mut poller = self.poller.lock().await;
        if let Some(handle) = poller.take() {
            self.state.lock().await.is_polling = false;
            handle.stop();
        }
    }

    /// Flip between polling and stopped. Concurrent toggles serialize
    /// on the poller slot, so the polling flag stays the single source
    /// of truth.
    pub async fn toggle_polling(&self) {
        let mut poller = self.poller.lock().await;
        if let Some(handle) = poller.take() {
            self.state.lock().await.is_polling = false;
            handle.stop();
        } else {
            self.state.lock().await.is_polling = true;
            *poller = Some(poller::spawn(
                Arc::clone(&self.source),
                Arc::clone(&self.state),
                self.config.clone(),
            ));
        }
    }
}

// ─── Application helpers ──────────────────────────────────────────

/// Apply a seed page: replace the buffer, initialize both cursors.
/// Offsets are validated before any mutation so a bad response cannot
/// tear the state.
fn apply_seed(st: &mut SessionState, page: HistoryPage) -> Result<(), SessionError> {
    cursor::validate(page.next_offset)?;
    cursor::validate(page.new_pos)?;
    st.buffer.clear();
    st.buffer.append(&page.content);
    st.cursors.advance_history(page.next_offset)?;
    st.cursors.advance_tail(page.new_pos)?;
    st.has_more_history = page.has_more;
    Ok(())
}

/// Apply an older-history page: prepend and walk the history cursor.
/// The tail cursor is untouched — tail and history fetches own disjoint
/// cursors and may be in flight simultaneously.
fn apply_history(st: &mut SessionState, page: HistoryPage) -> Result<(), SessionError> {
    cursor::validate(page.next_offset)?;
    st.buffer.prepend(&page.content);
    st.cursors.advance_history(page.next_offset)?;
    st.has_more_history = page.has_more;
    Ok(())
}

/// Run a blocking source call off the runtime with a hard deadline.
/// On timeout the abandoned call may still finish on the blocking pool,
/// but its result is dropped before any state mutation.
pub(crate) async fn fetch_with_timeout<T, F>(limit: Duration, fetch: F) -> Result<T, SessionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SourceError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(fetch)).await {
        Err(_) => Err(SessionError::FetchTimeout(limit)),
        Ok(Err(join)) => Err(SessionError::FetchFailed(SourceError::transport(join))),
        Ok(Ok(Err(e))) => Err(SessionError::FetchFailed(e)),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

// ─── Tests ────────────────────────────────────────────────────────
