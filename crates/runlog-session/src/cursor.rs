//! Cursor tracking: the two scalar read positions of a session.
//!
//! `tail` is the offset up to which new content has been consumed;
//! `history` is the bound for the next backward page. Both are pure
//! state setters — rotation detection and paging policy live with the
//! callers.

use crate::error::SessionError;

/// The two read positions of an active session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursors {
    tail: u64,
    history: u64,
}

impl Cursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tail(&self) -> u64 {
        self.tail
    }

    pub fn history(&self) -> u64 {
        self.history
    }

    /// Set the tail cursor unconditionally. Callers are responsible for
    /// rotation detection before calling this.
    pub fn advance_tail(&mut self, new_pos: i64) -> Result<(), SessionError> {
        self.tail = validate(new_pos)?;
        Ok(())
    }

    /// Set the history cursor unconditionally.
    pub fn advance_history(&mut self, next_offset: i64) -> Result<(), SessionError> {
        self.history = validate(next_offset)?;
        Ok(())
    }

    /// Reset both cursors to zero (task switch or explicit clear).
    pub fn reset(&mut self) {
        self.tail = 0;
        self.history = 0;
    }
}

/// Validate a wire offset into a cursor value. Negative offsets are a
/// transport contract violation upstream.
pub fn validate(value: i64) -> Result<u64, SessionError> {
    u64::try_from(value).map_err(|_| SessionError::InvalidCursor { value })
}

// ─── Tests ────────────────────────────────────────────────────────
