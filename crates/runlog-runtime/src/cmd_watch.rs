//! `runlog watch` — follow a task's log in the terminal.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use runlog_core::types::TaskId;
use runlog_session::{LogSync, SyncConfig};

use crate::client::RpcLogSource;

/// Entry point for `runlog watch`: seed with recent lines, poll for new
/// content, print deltas until ctrl-c.
pub async fn cmd_watch(
    socket_path: &str,
    task: TaskId,
    interval_ms: u64,
    lines: u32,
) -> anyhow::Result<()> {
    let source = Arc::new(RpcLogSource::new(socket_path));
    let mut config = SyncConfig::for_interval(Duration::from_millis(interval_ms));
    config.page_lines = lines;
    let sync = LogSync::new(source, config);

    sync.select_task(Some(task)).await?;
    sync.start_polling().await;

    let mut printed = String::new();
    let mut reported_error: Option<String> = None;

    loop {
        let view = sync.snapshot().await;

        if view.content != printed {
            if view.content.starts_with(&printed) {
                print!("{}", &view.content[printed.len()..]);
            } else {
                // Rotation or a buffer trim replaced the content wholesale.
                print!("\n{}", view.content);
            }
            std::io::stdout().flush().ok();
            printed = view.content;
        }

        if view.last_error != reported_error {
            if let Some(ref e) = view.last_error {
                eprintln!("runlog: fetch error: {e}");
            }
            reported_error = view.last_error;
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(interval_ms.min(500))) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    sync.stop_polling().await;
    println!();
    Ok(())
}
