//! The transport seam: whatever serves cursor reads for task logs.
//!
//! The trait is synchronous; the session drives it through
//! `tokio::task::spawn_blocking`, so implementations are free to do
//! plain blocking I/O (local files, a blocking socket client).

use runlog_core::types::{HistoryPage, TailChunk, TaskId};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),
}

impl SourceError {
    pub fn transport(detail: impl std::fmt::Display) -> Self {
        Self::Transport(detail.to_string())
    }
}

/// A source of per-task log content, addressed by byte-offset cursors.
pub trait LogSource: Send + Sync {
    /// Content appended since `from_pos`, plus the current end offset.
    /// Must be safe to call with `from_pos` beyond the true end.
    fn read_tail(&self, task: TaskId, from_pos: u64) -> Result<TailChunk, SourceError>;

    /// Up to `limit_lines` lines immediately preceding `before_offset`
    /// (`0` means end-of-file).
    fn read_history(
        &self,
        task: TaskId,
        before_offset: u64,
        limit_lines: u32,
    ) -> Result<HistoryPage, SourceError>;

    /// Truncate the task's persisted log.
    fn clear_log(&self, task: TaskId) -> Result<(), SourceError>;
}
