//! UDS JSON-RPC server: minimal hand-rolled implementation.
//! Connection-per-request, newline-delimited JSON, serving the cursor
//! read contract straight off the file store.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

use runlog_core::types::TaskId;
use runlog_store::FileStore;

/// Run the daemon: starts the UDS server and waits for a shutdown signal.
pub async fn run_daemon(socket_path: &str, store: FileStore) -> anyhow::Result<()> {
    let store = Arc::new(store);

    let server_store = Arc::clone(&store);
    let server_socket = socket_path.to_string();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = run_server(&server_socket, server_store).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    // Wait for shutdown signal (ctrl-c or SIGTERM)
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    tokio::select! {
        () = shutdown => {}
        _ = server_handle => {
            tracing::warn!("server exited unexpectedly");
        }
    }

    // Cleanup socket
    let _ = std::fs::remove_file(socket_path);
    tracing::info!("daemon stopped");
    Ok(())
}

/// Run the UDS JSON-RPC server.
pub async fn run_server(socket_path: &str, store: Arc<FileStore>) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, store).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    store: Arc<FileStore>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: serde_json::Value = serde_json::from_str(line.trim())?;
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();

    let response = match dispatch(&store, method, &request["params"]).await {
        Ok(result) => serde_json::json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": id,
        }),
        Err(e) => serde_json::json!({
            "jsonrpc": "2.0",
            "error": {"code": e.code, "message": e.message},
            "id": id,
        }),
    };
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    Ok(())
}

// ─── Dispatch ─────────────────────────────────────────────────────

pub(crate) struct RpcError {
    pub(crate) code: i64,
    pub(crate) message: String,
}

impl RpcError {
    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("method not found: {method}"),
        }
    }

    fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: detail.to_string(),
        }
    }

    fn store(e: impl std::fmt::Display) -> Self {
        Self {
            code: -32000,
            message: e.to_string(),
        }
    }
}

/// Route one RPC method to the store. File I/O runs on the blocking
/// pool so a slow disk cannot stall the accept loop.
pub(crate) async fn dispatch(
    store: &Arc<FileStore>,
    method: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    match method {
        "read_tail" => {
            let task = parse_task(params)?;
            let from_pos = params["from_pos"].as_u64().unwrap_or(0);
            let store = Arc::clone(store);
            let chunk = tokio::task::spawn_blocking(move || store.read_tail(task, from_pos))
                .await
                .map_err(RpcError::store)?
                .map_err(RpcError::store)?;
            serde_json::to_value(chunk).map_err(RpcError::store)
        }
        "read_history" => {
            let task = parse_task(params)?;
            let before_offset = params["before_offset"].as_u64().unwrap_or(0);
            let limit_lines = params["limit_lines"].as_u64().unwrap_or(50) as u32;
            let store = Arc::clone(store);
            let page = tokio::task::spawn_blocking(move || {
                store.read_history(task, before_offset, limit_lines)
            })
            .await
            .map_err(RpcError::store)?
            .map_err(RpcError::store)?;
            serde_json::to_value(page).map_err(RpcError::store)
        }
        "clear_log" => {
            let task = parse_task(params)?;
            let store = Arc::clone(store);
            tokio::task::spawn_blocking(move || store.clear(task))
                .await
                .map_err(RpcError::store)?
                .map_err(RpcError::store)?;
            Ok(serde_json::json!({"cleared": true}))
        }
        "append" => {
            let task = parse_task(params)?;
            let content = params["content"]
                .as_str()
                .ok_or_else(|| RpcError::invalid_params("missing content"))?
                .to_string();
            let store = Arc::clone(store);
            tokio::task::spawn_blocking(move || store.append(task, &content))
                .await
                .map_err(RpcError::store)?
                .map_err(RpcError::store)?;
            Ok(serde_json::json!({"appended": true}))
        }
        "list_tasks" => {
            let store = Arc::clone(store);
            let tasks = tokio::task::spawn_blocking(move || store.list_tasks())
                .await
                .map_err(RpcError::store)?
                .map_err(RpcError::store)?;
            serde_json::to_value(tasks).map_err(RpcError::store)
        }
        _ => Err(RpcError::method_not_found(method)),
    }
}

fn parse_task(params: &serde_json::Value) -> Result<TaskId, RpcError> {
    params["task_id"]
        .as_u64()
        .map(TaskId)
        .ok_or_else(|| RpcError::invalid_params("missing or invalid task_id"))
}

// ─── Tests ────────────────────────────────────────────────────────
