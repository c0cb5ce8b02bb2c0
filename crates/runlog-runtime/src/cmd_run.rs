//! `runlog run` — spawn a command and pipe its output into a task log.
//!
//! Both stdout and stderr are captured line-by-line and appended to the
//! task's log in arrival order; a stop marker records the exit code so
//! a viewer can tell where one run ends.

use std::process::Stdio;
use std::sync::mpsc;

use runlog_core::types::TaskId;
use runlog_store::FileStore;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

pub async fn cmd_run(store_root: &str, task: TaskId, command: &[String]) -> anyhow::Result<()> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("empty command"))?;

    let store = FileStore::new(store_root);

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow::anyhow!("cannot spawn {program}: {e}"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("child stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("child stderr not captured"))?;

    // Line pump: async readers feed a channel, one blocking writer
    // appends to the store in arrival order.
    let (tx, rx) = mpsc::channel::<String>();
    let writer_store = store.clone();
    let writer = tokio::task::spawn_blocking(move || {
        for line in rx {
            if let Err(e) = writer_store.append(task, &line) {
                tracing::warn!("append to task {task} failed: {e}");
            }
        }
    });

    let out_pump = tokio::spawn(pump_lines(stdout, tx.clone()));
    let err_pump = tokio::spawn(pump_lines(stderr, tx));

    let status = child.wait().await?;

    // Drain remaining buffered output, then let the writer finish.
    let _ = tokio::join!(out_pump, err_pump);
    writer
        .await
        .map_err(|e| anyhow::anyhow!("log writer task failed: {e}"))?;

    let code = status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    store.append(task, &format!("==== task stopped: exit code {code} ====\n"))?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}

async fn pump_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(format!("{line}\n")).is_err() {
            break;
        }
    }
}
