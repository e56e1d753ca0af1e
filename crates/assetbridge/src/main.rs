//! assetbridge - OAuth and MCP bridge for a remote asset-management server.
//!
//! This is the main entry point for the assetbridge CLI.

mod commands;

use assetbridge_server::BridgeConfig;
use clap::Parser;
use commands::{init_logging, run_server};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assetbridge")]
#[command(author, version, about = "OAuth and MCP bridge for asset management", long_about = None)]
struct Cli {
    /// Address to bind to (overrides config and PORT)
    #[arg(short, long)]
    address: Option<SocketAddr>,

    /// Path to a JSON config file (default: ./assetbridge.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of static files to serve
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, mut config: BridgeConfig) -> BridgeConfig {
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(dir) = self.static_dir {
            config.static_dir = dir;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = BridgeConfig::load(cli.config.as_deref()).await?;
    let config = cli.apply(config);

    run_server(config).await
}
