use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ircbus_core::{BusPath, MockNetworkFactory};
use ircbus_daemon::service::{self, ServiceConfig};

#[derive(Parser)]
#[command(name = "ircbusd", about = "Bridge IRC sessions onto a local message bus")]
#[command(version)]
struct Cli {
    /// Directory holding one <name>.toml definition per session
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Unix socket to listen on
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Bus path of the management surface
    #[arg(long, default_value = "/net/ircbus")]
    base_path: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => dirs::config_dir()
            .context("no configuration directory for this platform")?
            .join("ircbus"),
    };
    let socket_path = match cli.socket {
        Some(path) => path,
        None => dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("ircbusd.sock"),
    };
    let base_path = BusPath::parse(&cli.base_path).context("invalid base path")?;

    // This build links no wire protocol implementation; sessions run
    // against the in-memory network layer. Deployments provide a real
    // one through ircbus_core::NetworkFactory.
    info!("no wire protocol linked; using the in-memory network layer");
    let factory = Arc::new(MockNetworkFactory::new());

    service::run(ServiceConfig::new(socket_path, config_dir, base_path), factory).await
}
