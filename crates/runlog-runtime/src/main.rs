//! runlog: per-task run log daemon and follower.
//! Single binary embedding the daemon, the producer-side `run` command,
//! and the viewer-side client commands.

use clap::Parser;

mod cli;
mod client;
mod cmd_run;
mod cmd_watch;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Daemon(opts) => {
            init_tracing();
            tracing::info!("runlog daemon starting");
            let store = runlog_store::FileStore::new(&opts.store_root);
            server::run_daemon(&socket_path, store).await?;
        }
        cli::Command::Run(opts) => {
            init_tracing();
            cmd_run::cmd_run(&opts.store_root, opts.task, &opts.command).await?;
        }
        cli::Command::Watch(opts) => {
            cmd_watch::cmd_watch(&socket_path, opts.task, opts.interval_ms, opts.lines).await?;
        }
        cli::Command::Tail(opts) => {
            client::cmd_tail(&socket_path, opts.task, opts.lines).await?;
        }
        cli::Command::Clear { task } => {
            client::cmd_clear(&socket_path, task).await?;
        }
        cli::Command::Ls => {
            client::cmd_ls(&socket_path).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUNLOG_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
