//! runlog-session: viewer-side log synchronization.
//!
//! Binds one task at a time, seeds a bounded buffer with the most recent
//! lines, polls forward for new content, pages backward for history, and
//! survives source-side rotation — all over a pluggable [`LogSource`].

pub mod buffer;
pub mod cursor;
pub mod error;
pub mod poller;
pub mod session;
pub mod source;
#[cfg(test)]
pub(crate) mod testing;

pub use buffer::LogBuffer;
pub use cursor::Cursors;
pub use error::SessionError;
pub use session::{LogSync, SyncConfig, ViewState};
pub use source::{LogSource, SourceError};
