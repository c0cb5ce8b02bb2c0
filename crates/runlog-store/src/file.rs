//! File-backed log store: one `task-<id>.log` file per task under a
//! store root, with byte-offset cursor reads in both directions.
//!
//! Forward reads return everything appended since a position; backward
//! reads page over complete lines so a viewer can walk into history
//! without ever re-reading the whole file.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use runlog_core::types::{HistoryPage, TailChunk, TaskId, TaskMeta};

use crate::error::StoreError;

/// Block size for the backward newline scan.
const SCAN_CHUNK: u64 = 8 * 1024;

/// File-backed store serving the cursor read contract for task logs.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the log file for `task` under the store root.
    pub fn task_log_path(&self, task: TaskId) -> PathBuf {
        self.root.join(format!("task-{task}.log"))
    }

    // ─── Forward incremental read ─────────────────────────────────

    /// Read everything appended since `from_pos`.
    ///
    /// A missing log file reads as empty at position zero. A `from_pos`
    /// at or beyond the true end returns empty content with `new_pos`
    /// corrected to the true end, which is how a truncated log becomes
    /// visible to a client holding a now-too-large cursor.
    pub fn read_tail(&self, task: TaskId, from_pos: u64) -> Result<TailChunk, StoreError> {
        let path = self.task_log_path(task);
        let mut file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(TailChunk {
                    new_content: String::new(),
                    new_pos: 0,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();
        if from_pos >= size {
            return Ok(TailChunk {
                new_content: String::new(),
                new_pos: size as i64,
            });
        }

        file.seek(SeekFrom::Start(from_pos))?;
        let mut buf = Vec::with_capacity((size - from_pos) as usize);
        file.read_to_end(&mut buf)?;

        Ok(TailChunk {
            new_content: String::from_utf8_lossy(&buf).into_owned(),
            new_pos: (from_pos + buf.len() as u64) as i64,
        })
    }

    // ─── Backward history read ────────────────────────────────────

    /// Read up to `limit_lines` complete lines immediately preceding
    /// `before_offset` (`0` means end-of-file).
    ///
    /// `next_offset` is the byte offset of the earliest returned line;
    /// passing it back as the next `before_offset` walks strictly
    /// toward the start of the file. Content carries no trailing
    /// newline.
    pub fn read_history(
        &self,
        task: TaskId,
        before_offset: u64,
        limit_lines: u32,
    ) -> Result<HistoryPage, StoreError> {
        let path = self.task_log_path(task);
        let mut file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(HistoryPage {
                    content: String::new(),
                    next_offset: 0,
                    has_more: false,
                    new_pos: 0,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();
        let bound = if before_offset == 0 || before_offset > size {
            size
        } else {
            before_offset
        };

        if limit_lines == 0 {
            return Ok(HistoryPage {
                content: String::new(),
                next_offset: bound as i64,
                has_more: bound > 0,
                new_pos: size as i64,
            });
        }

        // A newline at bound-1 terminates the last line rather than
        // separating it from an older one; exclude it from the scan.
        let mut end = bound;
        if end > 0 {
            let mut b = [0u8; 1];
            file.seek(SeekFrom::Start(end - 1))?;
            file.read_exact(&mut b)?;
            if b[0] == b'\n' {
                end -= 1;
            }
        }

        if end == 0 {
            return Ok(HistoryPage {
                content: String::new(),
                next_offset: 0,
                has_more: false,
                new_pos: size as i64,
            });
        }

        let start = scan_line_start(&mut file, end, limit_lines)?;

        let mut buf = vec![0u8; (end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut buf)?;

        Ok(HistoryPage {
            content: String::from_utf8_lossy(&buf).into_owned(),
            next_offset: start as i64,
            has_more: start > 0,
            new_pos: size as i64,
        })
    }

    // ─── Mutation ─────────────────────────────────────────────────

    /// Producer-side append, creating the store root and the log file
    /// on first write.
    pub fn append(&self, task: TaskId, content: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.task_log_path(task))?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Truncate the task's log to zero length. Clearing a task with no
    /// log file is a no-op success.
    pub fn clear(&self, task: TaskId) -> Result<(), StoreError> {
        let path = self.task_log_path(task);
        match OpenOptions::new().write(true).truncate(true).open(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("clear: no log file for task {task}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ─── Introspection ────────────────────────────────────────────

    /// Enumerate task logs under the store root, sorted by task id.
    /// Files not matching the `task-<id>.log` pattern are skipped.
    pub fn list_tasks(&self) -> Result<Vec<TaskMeta>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tasks = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(task_id) = parse_log_filename(&name.to_string_lossy()) else {
                continue;
            };
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let modified_at = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            tasks.push(TaskMeta {
                task_id,
                size_bytes: meta.len(),
                modified_at,
            });
        }

        tasks.sort_by_key(|t| t.task_id);
        Ok(tasks)
    }
}

/// Scan backward from `end` for the start offset of the `limit`-th line.
/// Returns 0 if the region holds fewer than `limit` complete lines.
fn scan_line_start(file: &mut fs::File, end: u64, limit: u32) -> Result<u64, StoreError> {
    let mut newlines = 0u32;
    let mut scan_end = end;

    while scan_end > 0 {
        let chunk_start = scan_end.saturating_sub(SCAN_CHUNK);
        let mut buf = vec![0u8; (scan_end - chunk_start) as usize];
        file.seek(SeekFrom::Start(chunk_start))?;
        file.read_exact(&mut buf)?;

        for (i, byte) in buf.iter().enumerate().rev() {
            if *byte == b'\n' {
                newlines += 1;
                if newlines == limit {
                    return Ok(chunk_start + i as u64 + 1);
                }
            }
        }
        scan_end = chunk_start;
    }

    Ok(0)
}

/// Parse a `task-<id>.log` filename into its task id.
fn parse_log_filename(name: &str) -> Option<TaskId> {
    name.strip_prefix("task-")?
        .strip_suffix(".log")?
        .parse::<u64>()
        .ok()
        .map(TaskId)
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    const TASK: TaskId = TaskId(1);

    // ── Forward reads ───────────────────────────────────────────────

    #[test]
    fn read_tail_missing_file_is_empty_at_zero() {
        let (_dir, store) = store();
        let chunk = store.read_tail(TASK, 0).expect("read");
        assert_eq!(chunk.new_content, "");
        assert_eq!(chunk.new_pos, 0);
    }

    #[test]
    fn read_tail_from_zero_returns_everything() {
        let (_dir, store) = store();
        store.append(TASK, "line1\nline2\n").expect("append");

        let chunk = store.read_tail(TASK, 0).expect("read");
        assert_eq!(chunk.new_content, "line1\nline2\n");
        assert_eq!(chunk.new_pos, 12);
    }

    #[test]
    fn read_tail_is_incremental() {
        let (_dir, store) = store();
        store.append(TASK, "hello").expect("append");

        let chunk = store.read_tail(TASK, 0).expect("read");
        assert_eq!(chunk.new_pos, 5);

        store.append(TASK, " world").expect("append");
        let chunk = store.read_tail(TASK, 5).expect("read");
        assert_eq!(chunk.new_content, " world");
        assert_eq!(chunk.new_pos, 11);
    }

    #[test]
    fn read_tail_at_end_returns_empty() {
        let (_dir, store) = store();
        store.append(TASK, "hello").expect("append");

        let chunk = store.read_tail(TASK, 5).expect("read");
        assert_eq!(chunk.new_content, "");
        assert_eq!(chunk.new_pos, 5);
    }

    #[test]
    fn read_tail_beyond_end_corrects_position() {
        // A cursor past the true end means the file shrank under the
        // reader; the corrected new_pos lets the client detect rotation.
        let (_dir, store) = store();
        store.append(TASK, "hello").expect("append");

        let chunk = store.read_tail(TASK, 500).expect("read");
        assert_eq!(chunk.new_content, "");
        assert_eq!(chunk.new_pos, 5);
    }

    // ── Backward history reads ──────────────────────────────────────

    #[test]
    fn read_history_missing_file_is_empty() {
        let (_dir, store) = store();
        let page = store.read_history(TASK, 0, 50).expect("read");
        assert_eq!(page.content, "");
        assert_eq!(page.next_offset, 0);
        assert!(!page.has_more);
        assert_eq!(page.new_pos, 0);
    }

    #[test]
    fn read_history_tail_of_file() {
        let (_dir, store) = store();
        store.append(TASK, "a\nbb\nccc\ndddd\n").expect("append");

        let page = store.read_history(TASK, 0, 2).expect("read");
        assert_eq!(page.content, "ccc\ndddd");
        // "a\nbb\n" is 5 bytes; "ccc" starts at 5
        assert_eq!(page.next_offset, 5);
        assert!(page.has_more);
        assert_eq!(page.new_pos, 14);
    }

    #[test]
    fn read_history_pages_walk_to_start() {
        let (_dir, store) = store();
        store.append(TASK, "a\nbb\nccc\ndddd\n").expect("append");

        let first = store.read_history(TASK, 0, 2).expect("read");
        let second = store
            .read_history(TASK, first.next_offset as u64, 2)
            .expect("read");
        assert_eq!(second.content, "a\nbb");
        assert_eq!(second.next_offset, 0);
        assert!(!second.has_more);
    }

    #[test]
    fn read_history_next_offset_strictly_decreases() {
        let (_dir, store) = store();
        let body: String = (0..40).map(|i| format!("line number {i}\n")).collect();
        store.append(TASK, &body).expect("append");

        let mut before = 0u64;
        let mut last_offset = i64::MAX;
        loop {
            let page = store.read_history(TASK, before, 7).expect("read");
            assert!(
                page.next_offset < last_offset,
                "offsets must strictly decrease: {} then {}",
                last_offset,
                page.next_offset
            );
            last_offset = page.next_offset;
            if !page.has_more {
                break;
            }
            before = page.next_offset as u64;
        }
        assert_eq!(last_offset, 0, "paging must terminate at file start");
    }

    #[test]
    fn read_history_whole_file_in_one_page() {
        let (_dir, store) = store();
        store.append(TASK, "a\nbb\nccc\n").expect("append");

        let page = store.read_history(TASK, 0, 50).expect("read");
        assert_eq!(page.content, "a\nbb\nccc");
        assert_eq!(page.next_offset, 0);
        assert!(!page.has_more);
    }

    #[test]
    fn read_history_no_trailing_newline() {
        let (_dir, store) = store();
        store.append(TASK, "a\nbb\nccc").expect("append");

        let page = store.read_history(TASK, 0, 1).expect("read");
        assert_eq!(page.content, "ccc");
        assert_eq!(page.next_offset, 5);
        assert!(page.has_more);
    }

    #[test]
    fn read_history_lines_longer_than_scan_chunk() {
        let (_dir, store) = store();
        let long_line = "x".repeat(3 * SCAN_CHUNK as usize);
        let body = format!("first\n{long_line}\nlast\n");
        store.append(TASK, &body).expect("append");

        let page = store.read_history(TASK, 0, 2).expect("read");
        assert_eq!(page.content, format!("{long_line}\nlast"));
        assert_eq!(page.next_offset, 6, "page starts after 'first\\n'");
        assert!(page.has_more);
    }

    #[test]
    fn read_history_bound_beyond_end_clamps_to_eof() {
        let (_dir, store) = store();
        store.append(TASK, "a\nbb\n").expect("append");

        let page = store.read_history(TASK, 9_999, 10).expect("read");
        assert_eq!(page.content, "a\nbb");
        assert_eq!(page.next_offset, 0);
        assert!(!page.has_more);
    }

    #[test]
    fn read_history_zero_limit_makes_no_progress() {
        let (_dir, store) = store();
        store.append(TASK, "a\nbb\n").expect("append");

        let page = store.read_history(TASK, 0, 0).expect("read");
        assert_eq!(page.content, "");
        assert_eq!(page.next_offset, 5);
        assert!(page.has_more);
    }

    // ── Clear ───────────────────────────────────────────────────────

    #[test]
    fn clear_truncates_existing_log() {
        let (_dir, store) = store();
        store.append(TASK, "some logs").expect("append");

        store.clear(TASK).expect("clear");

        let chunk = store.read_tail(TASK, 0).expect("read");
        assert_eq!(chunk.new_content, "");
        assert_eq!(chunk.new_pos, 0);
    }

    #[test]
    fn clear_missing_log_is_ok() {
        let (_dir, store) = store();
        store.clear(TASK).expect("clear of missing file succeeds");
    }

    #[test]
    fn cleared_log_reads_as_rotated() {
        // A reader holding an old cursor sees new_pos fall below it.
        let (_dir, store) = store();
        store.append(TASK, "0123456789").expect("append");
        store.clear(TASK).expect("clear");
        store.append(TASK, "fresh").expect("append");

        let chunk = store.read_tail(TASK, 10).expect("read");
        assert_eq!(chunk.new_content, "");
        assert_eq!(chunk.new_pos, 5, "corrected below the stale cursor");
    }

    // ── Listing ─────────────────────────────────────────────────────

    #[test]
    fn list_tasks_empty_root() {
        let (_dir, store) = store();
        assert!(store.list_tasks().expect("list").is_empty());
    }

    #[test]
    fn list_tasks_sorted_and_filtered() {
        let (dir, store) = store();
        store.append(TaskId(3), "ccc").expect("append");
        store.append(TaskId(1), "a").expect("append");
        fs::write(dir.path().join("notes.txt"), "ignore me").expect("write");
        fs::write(dir.path().join("task-x.log"), "bad id").expect("write");

        let tasks = store.list_tasks().expect("list");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task_id, TaskId(1));
        assert_eq!(tasks[0].size_bytes, 1);
        assert_eq!(tasks[1].task_id, TaskId(3));
        assert_eq!(tasks[1].size_bytes, 3);
    }

    #[test]
    fn parse_log_filename_cases() {
        assert_eq!(parse_log_filename("task-12.log"), Some(TaskId(12)));
        assert_eq!(parse_log_filename("task-.log"), None);
        assert_eq!(parse_log_filename("task-12.txt"), None);
        assert_eq!(parse_log_filename("other-12.log"), None);
    }
}
