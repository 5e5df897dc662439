use std::{error::Error, net::SocketAddr, path::Path, time::Duration};

use clap::Parser;
use node::{AppState, DEFAULT_MAX_BODY_BYTES, NodeConfig, build_store, parse_listen_addr, serve};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Heartbeat ledger node
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Listen address: a port (`8080`, `:8080`) or `host:port`
    #[arg(long, env = "ADDR", default_value = "8080", value_parser = parse_listen_addr)]
    addr: SocketAddr,

    /// Per-request time limit in seconds
    #[arg(long, env = "LEDGER_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    request_timeout_secs: u64,

    /// Largest accepted request body in bytes
    #[arg(long, env = "LEDGER_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Only adopt candidate chains rooted at this node's genesis block
    #[arg(long, env = "LEDGER_ANCHOR_GENESIS")]
    anchor_genesis: bool,
}

impl From<Args> for NodeConfig {
    fn from(args: Args) -> Self {
        Self {
            listen_addr: args.addr,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            max_body_bytes: args.max_body_bytes,
            anchor_genesis: args.anchor_genesis,
        }
    }
}

/// Load `path` into the process environment without overriding variables
/// that are already set. Returns whether a file was found.
fn load_env_file(path: &Path) -> Result<bool, dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(err) if err.not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // before tracing, so RUST_LOG may come from the file too
    let env_file = load_env_file(Path::new(".env"));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match env_file {
        Ok(true) => info!("Loaded environment from .env"),
        Ok(false) => debug!("No .env file, using process environment"),
        Err(err) => return Err(format!("failed to load .env: {err}").into()),
    }

    let config = NodeConfig::from(Args::parse());
    info!(?config, "Starting heartbeat node");

    // genesis goes in before the listener opens
    let store = build_store(&config);

    let listener = TcpListener::bind(config.listen_addr).await?;
    serve(listener, AppState::new(store), &config, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
