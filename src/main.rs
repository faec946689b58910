use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tether_bridge::{BridgeServer, Config};

/// Tether - device bridge for AI-assisted mobile app development
#[derive(Parser)]
#[command(name = "tether", version, about)]
struct Cli {
    /// Port to listen on for device connections
    #[arg(long, env = "TETHER_PORT")]
    port: Option<u16>,

    /// Path to a TOML config file (default: ~/.config/tether/config.toml)
    #[arg(long, env = "TETHER_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,tether_bridge=info",
        1 => "info,tether_bridge=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(Some(path))?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    let server = BridgeServer::new(config).bind().await?;
    tracing::info!("tether bridge ready - connect your app");

    server.run().await?;
    Ok(())
}
