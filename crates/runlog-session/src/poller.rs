//! Tail poll scheduler: a tokio task that fetches new content for the
//! bound task on a fixed cadence.
//!
//! The loop is serial — a tick runs to completion before the next one
//! is considered — and the `in_flight_tail` flag additionally guards
//! against a manual refresh overlapping a scheduled tick. Stopping
//! signals the loop through a watch channel instead of aborting it, so
//! a fetch already in flight completes and its result still applies.

use std::sync::Arc;

use runlog_core::types::TailChunk;
use tokio::sync::{Mutex, watch};
use tokio::time::interval;

use crate::cursor;
use crate::error::SessionError;
use crate::session::{SessionState, SyncConfig, fetch_with_timeout};
use crate::source::LogSource;

/// Handle to a running poll loop.
pub(crate) struct PollerHandle {
    stop_tx: watch::Sender<bool>,
}

impl PollerHandle {
    /// Signal the loop to wind down. Returns immediately; an in-flight
    /// tick finishes and applies before the loop exits.
    pub(crate) fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Spawn the poll loop. The first tick fires immediately so the viewer
/// does not wait a full interval for first content.
pub(crate) fn spawn<S: LogSource + 'static>(
    source: Arc<S>,
    state: Arc<Mutex<SessionState>>,
    config: SyncConfig,
) -> PollerHandle {
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(run_poll_loop(source, state, config, stop_rx));
    PollerHandle { stop_tx }
}

async fn run_poll_loop<S: LogSource + 'static>(
    source: Arc<S>,
    state: Arc<Mutex<SessionState>>,
    config: SyncConfig,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(config.poll_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // stop() may have raced the tick
                if !state.lock().await.is_polling {
                    break;
                }
                if let Err(e) = poll_tick(&source, &state, &config).await {
                    tracing::warn!("tail poll tick failed: {e}");
                }
            }
            // Fires on stop() and when the handle is dropped.
            _ = stop_rx.changed() => break,
        }
    }
}

/// One forward incremental fetch: read from the tail cursor, detect
/// rotation, append, advance.
///
/// Skips silently when no task is bound or a tail fetch is already in
/// flight. A rebind while the fetch is suspended discards the result.
pub(crate) async fn poll_tick<S: LogSource + 'static>(
    source: &Arc<S>,
    state: &Arc<Mutex<SessionState>>,
    config: &SyncConfig,
) -> Result<(), SessionError> {
    let (task, from_pos, epoch) = {
        let mut st = state.lock().await;
        let Some(task) = st.task else {
            return Ok(());
        };
        if st.in_flight_tail {
            return Ok(());
        }
        st.in_flight_tail = true;
        (task, st.cursors.tail(), st.epoch)
    };

    let fetch_source = Arc::clone(source);
    let result = fetch_with_timeout(config.fetch_timeout, move || {
        fetch_source.read_tail(task, from_pos)
    })
    .await;

    let mut st = state.lock().await;
    if st.epoch != epoch {
        return Ok(());
    }
    st.in_flight_tail = false;
    match result.and_then(|chunk| apply_tail(&mut st, chunk)) {
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

/// Apply a tail chunk under the state lock.
fn apply_tail(st: &mut SessionState, chunk: TailChunk) -> Result<(), SessionError> {
    let new_pos = cursor::validate(chunk.new_pos)?;
    if new_pos < st.cursors.tail() {
        // Source log rotated or cleared: the buffered content no longer
        // corresponds to live offsets; resume from the reported position.
        tracing::debug!(
            "rotation detected: new_pos {new_pos} below tail cursor {}",
            st.cursors.tail()
        );
        st.buffer.clear();
    }
    st.buffer.append(&chunk.new_content);
    // The end offset may move even when nothing new was appended.
    st.cursors.advance_tail(chunk.new_pos)?;
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────
