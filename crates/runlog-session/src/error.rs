//! Error types for the session layer.

use std::time::Duration;
use thiserror::Error;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The source reported a negative offset — a transport contract
    /// violation, fatal to the call but not to the session.
    #[error("invalid cursor from source: {value}")]
    InvalidCursor { value: i64 },

    #[error("fetch failed: {0}")]
    FetchFailed(#[from] SourceError),

    #[error("fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    /// A source-side clear failed; local state was left untouched.
    #[error("clear failed: {0}")]
    ClearFailed(SourceError),
}
