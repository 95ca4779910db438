use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskhub::executor::CommandExecutor;
use taskhub::server::Server;
use taskhub::storage;

const STOP_COMMAND: &str = "stop";

#[derive(Parser)]
#[command(name = "taskhub")]
#[command(about = "Multi-user task management server", long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to listen on
    #[arg(short, long, default_value_t = 9999)]
    port: u16,
    /// Snapshot file (defaults to $TASKHUB_DB or the local data directory)
    #[arg(long)]
    data_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let data_file = cli.data_file.unwrap_or_else(storage::default_store_path);

    let store = storage::load_store(&data_file);
    let executor = Rc::new(RefCell::new(CommandExecutor::new(store)));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("failed to build runtime")?;
    let local = tokio::task::LocalSet::new();

    let server = Server::new(cli.host, cli.port, Rc::clone(&executor));

    runtime.block_on(local.run_until(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut server_task =
            tokio::task::spawn_local(async move { server.run(shutdown_rx).await });

        tokio::select! {
            // The server only returns on its own if it could not start.
            result = &mut server_task => {
                result.context("server task failed")??;
            }
            _ = wait_for_stop() => {
                let _ = shutdown_tx.send(true);
                server_task.await.context("server task failed")??;
            }
        }

        Ok::<(), anyhow::Error>(())
    }))?;

    storage::save_store(&data_file, executor.borrow().store())
        .with_context(|| format!("failed to write snapshot {}", data_file.display()))?;
    info!("snapshot saved to {}", data_file.display());

    Ok(())
}

/// Blocks until `stop` is typed on the console. Closing stdin also stops the
/// server, so it can run detached from a terminal.
async fn wait_for_stop() {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim() == STOP_COMMAND => break,
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }
}
