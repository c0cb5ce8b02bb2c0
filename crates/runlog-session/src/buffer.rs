//! Bounded assembled-log buffer: append with trimming, prepend for
//! history pages, clear.
//!
//! Trimming only guards appends — a producer can run far ahead of a
//! paused viewer, while backward paging is viewer-driven and bounded.
//! Sizes count chars so a trim never lands inside a UTF-8 sequence.

use runlog_core::limits::BufferLimits;

/// The assembled content shown to the viewer, oldest-to-newest.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    content: String,
    chars: usize,
    limits: BufferLimits,
}

impl LogBuffer {
    pub fn new(limits: BufferLimits) -> Self {
        Self {
            content: String::new(),
            chars: 0,
            limits,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn char_count(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Append new tail content. If the result exceeds `max_chars`, the
    /// buffer is replaced by the trim notice plus the most recent
    /// `trim_chars` chars — truncation stays observable instead of
    /// silently losing data.
    pub fn append(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        self.content.push_str(content);
        self.chars += content.chars().count();

        if self.chars > self.limits.max_chars() {
            let keep = self.limits.trim_chars();
            let cut_at = self
                .content
                .char_indices()
                .rev()
                .nth(keep - 1)
                .map(|(i, _)| i)
                .unwrap_or(0);
            let tail = self.content.split_off(cut_at);
            self.content = format!("{}\n{tail}", self.limits.trim_notice());
            self.chars = self.limits.trim_notice().chars().count() + 1 + keep;
        }
    }

    /// Prepend an older-history page. Does not trim.
    pub fn prepend(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        if self.content.is_empty() {
            self.content = content.to_string();
            self.chars = content.chars().count();
        } else {
            self.content = format!("{content}\n{}", self.content);
            self.chars += content.chars().count() + 1;
        }
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.chars = 0;
    }
}

// ─── Tests ────────────────────────────────────────────────────────
