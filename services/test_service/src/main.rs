//! Bridge test service entry point

use anyhow::Result;
use bridge_config::BridgeConfig;
use bridge_test_service::{init_tracing, TestService};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unix socket to listen on
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Per-handler timeout in milliseconds
    #[arg(long)]
    handler_timeout_ms: Option<u64>,

    /// Component name to serve
    #[arg(long)]
    component: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = BridgeConfig::load(args.config.as_deref())?;
    if let Some(socket) = args.socket {
        config.server.socket_path = socket;
    }
    if let Some(timeout_ms) = args.handler_timeout_ms {
        config.server.handler_timeout_ms = timeout_ms;
    }
    if let Some(component) = args.component {
        config.node.component = component;
    }
    config.expand_env_vars()?;
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_tracing(&config.logging.level);
    info!("Starting bridge test service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let service = TestService::bind(&config).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = service.run() => {
            if let Err(e) = result {
                error!("Test service error: {}", e);
                return Err(e);
            }
        }
        _ = shutdown_signal => {
            info!("Shutting down test service");
        }
    }

    Ok(())
}
