//! Blocking UDS JSON-RPC client, plus the one-shot CLI subcommands
//! built on it.
//!
//! The client is synchronous on purpose: it implements the session's
//! [`LogSource`] seam, which is driven through `spawn_blocking`, so
//! plain blocking socket I/O is the simplest correct shape.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

use runlog_core::types::{HistoryPage, TailChunk, TaskId, TaskMeta};
use runlog_session::{LogSource, SourceError};

/// JSON-RPC log source talking to a `runlog daemon` socket.
pub struct RpcLogSource {
    socket_path: String,
}

impl RpcLogSource {
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, SourceError> {
        let mut stream = UnixStream::connect(&self.socket_path).map_err(|e| {
            SourceError::transport(format!(
                "cannot connect to daemon at {}: {e}",
                self.socket_path
            ))
        })?;

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        let mut req = serde_json::to_string(&request).map_err(SourceError::transport)?;
        req.push('\n');
        stream
            .write_all(req.as_bytes())
            .map_err(SourceError::transport)?;
        stream
            .shutdown(std::net::Shutdown::Write)
            .map_err(SourceError::transport)?;

        let mut reader = BufReader::new(&stream);
        let mut line = String::new();
        reader.read_line(&mut line).map_err(SourceError::transport)?;

        let response: serde_json::Value =
            serde_json::from_str(line.trim()).map_err(SourceError::transport)?;

        if let Some(error) = response.get("error") {
            return Err(SourceError::transport(format!("RPC error: {error}")));
        }

        Ok(response["result"].clone())
    }

    /// Task listing — daemon-side introspection, not part of the
    /// session seam.
    pub fn list_tasks(&self) -> Result<Vec<TaskMeta>, SourceError> {
        let result = self.call("list_tasks", serde_json::json!({}))?;
        serde_json::from_value(result).map_err(SourceError::transport)
    }
}

impl LogSource for RpcLogSource {
    fn read_tail(&self, task: TaskId, from_pos: u64) -> Result<TailChunk, SourceError> {
        let result = self.call(
            "read_tail",
            serde_json::json!({"task_id": task.as_u64(), "from_pos": from_pos}),
        )?;
        serde_json::from_value(result).map_err(SourceError::transport)
    }

    fn read_history(
        &self,
        task: TaskId,
        before_offset: u64,
        limit_lines: u32,
    ) -> Result<HistoryPage, SourceError> {
        let result = self.call(
            "read_history",
            serde_json::json!({
                "task_id": task.as_u64(),
                "before_offset": before_offset,
                "limit_lines": limit_lines,
            }),
        )?;
        serde_json::from_value(result).map_err(SourceError::transport)
    }

    fn clear_log(&self, task: TaskId) -> Result<(), SourceError> {
        self.call("clear_log", serde_json::json!({"task_id": task.as_u64()}))?;
        Ok(())
    }
}

// ─── One-shot subcommands ─────────────────────────────────────────

/// `runlog tail` — print the most recent lines of a task's log.
pub async fn cmd_tail(socket_path: &str, task: TaskId, lines: u32) -> anyhow::Result<()> {
    let source = RpcLogSource::new(socket_path);
    let page = tokio::task::spawn_blocking(move || source.read_history(task, 0, lines)).await??;
    if page.content.is_empty() {
        println!("(no log output)");
    } else {
        println!("{}", page.content);
    }
    Ok(())
}

/// `runlog clear` — truncate a task's log. A failure is a hard error;
/// pretending the log is gone when it is not would mislead the caller.
pub async fn cmd_clear(socket_path: &str, task: TaskId) -> anyhow::Result<()> {
    let source = RpcLogSource::new(socket_path);
    tokio::task::spawn_blocking(move || source.clear_log(task)).await??;
    println!("log cleared for task {task}");
    Ok(())
}

/// `runlog ls` — list task logs with sizes and modification times.
pub async fn cmd_ls(socket_path: &str) -> anyhow::Result<()> {
    let source = RpcLogSource::new(socket_path);
    let tasks = tokio::task::spawn_blocking(move || source.list_tasks()).await??;

    if tasks.is_empty() {
        println!("no task logs");
        return Ok(());
    }

    println!("{:>6}  {:>10}  MODIFIED", "TASK", "SIZE");
    for meta in tasks {
        println!(
            "{:>6}  {:>10}  {}",
            meta.task_id,
            format_size(meta.size_bytes),
            meta.modified_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

/// Human-readable byte size, separated for testability.
pub(crate) fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}
