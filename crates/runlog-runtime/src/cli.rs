//! CLI definition using clap derive.

use clap::{Parser, Subcommand};
use runlog_core::types::TaskId;

#[derive(Parser)]
#[command(name = "runlog", about = "per-task run log daemon and follower")]
pub struct Cli {
    /// UDS socket path (default: /tmp/runlog-$USER/runlogd.sock)
    #[arg(long, short = 's', global = true, env = "RUNLOG_SOCKET")]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the log daemon (UDS JSON-RPC server over a file store)
    Daemon(DaemonOpts),
    /// Run a command, piping its output into a task log
    Run(RunOpts),
    /// Follow a task's log: seed with recent lines, then poll for new content
    Watch(WatchOpts),
    /// Print the most recent lines of a task's log
    Tail(TailOpts),
    /// Truncate a task's log
    Clear {
        /// Task whose log to clear
        task: TaskId,
    },
    /// List task logs in the store
    Ls,
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Directory holding the task log files
    #[arg(long, default_value = "logs")]
    pub store_root: String,
}

#[derive(clap::Args)]
pub struct RunOpts {
    /// Task id the output is logged under
    #[arg(long)]
    pub task: TaskId,

    /// Directory holding the task log files
    #[arg(long, default_value = "logs")]
    pub store_root: String,

    /// Command (and arguments) to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(clap::Args)]
pub struct WatchOpts {
    /// Task to follow
    pub task: TaskId,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "2000")]
    pub interval_ms: u64,

    /// Lines to seed the view with
    #[arg(short = 'n', long, default_value = "50")]
    pub lines: u32,
}

#[derive(clap::Args)]
pub struct TailOpts {
    /// Task to read
    pub task: TaskId,

    /// Number of lines to print
    #[arg(short = 'n', long, default_value = "50")]
    pub lines: u32,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/runlog/runlogd.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/runlog-{user}/runlogd.sock")
}
