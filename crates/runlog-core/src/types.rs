use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Task identity ────────────────────────────────────────────────

/// Identifier of a task whose log is being produced and followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(TaskId)
            .map_err(|_| CoreError::InvalidTaskId(s.to_string()))
    }
}

// ─── Wire contract ────────────────────────────────────────────────

/// Result of a forward incremental read: everything appended since
/// `from_pos`, plus the log's current end offset.
///
/// Offsets are byte offsets into the task's log file. They travel as
/// signed integers because the transport is JSON; the session layer
/// validates them into cursors and treats a negative value as a
/// contract violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailChunk {
    pub new_content: String,
    pub new_pos: i64,
}

/// One backward page of history: up to `limit_lines` complete lines
/// immediately preceding the requested bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// The lines, joined with `\n`, no trailing newline.
    pub content: String,
    /// Byte offset of the earliest returned line — the bound to pass
    /// for the next older page.
    pub next_offset: i64,
    /// Whether still-older content exists before `next_offset`.
    pub has_more: bool,
    /// The log's current end offset (seeds the tail cursor).
    pub new_pos: i64,
}

/// Metadata for one task log in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMeta {
    pub task_id: TaskId,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    InvalidTaskId(String),
    InvalidLimits { detail: String },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTaskId(s) => write!(f, "invalid task id: {s}"),
            Self::InvalidLimits { detail } => write!(f, "invalid buffer limits: {detail}"),
        }
    }
}

impl std::error::Error for CoreError {}

// ─── Tests ────────────────────────────────────────────────────────
