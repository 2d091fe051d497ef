//! One-shot bridge client
//!
//! ```text
//! bridge-call --socket /tmp/bridge/test_service.sock kvPut string:K string:V string:String
//! bridge-call kvGet string:K
//! ```
//!
//! Prints the result payload as JSON; a failed call exits non-zero.

use anyhow::{Context, Result};
use bridge_codec::CallResult;
use bridge_network::{Session, Transport, UnixSocketConnection};
use bridge_rpc::CallProxy;
use bridge_test_service::cli::{client_config, parse_typed_arg, ClientOverrides};
use bridge_test_service::init_tracing;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "bridge-call", author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unix socket of the test service
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Call timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Target component
    #[arg(long)]
    component: Option<String>,

    /// Operation to invoke
    operation: String,

    /// Arguments as TAG:VALUE
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = client_config(
        args.config.as_deref(),
        ClientOverrides {
            socket: args.socket,
            component: args.component,
            timeout_ms: args.timeout_ms,
        },
    )?;
    init_tracing(&config.logging.level);

    let call_args = args
        .args
        .iter()
        .map(|raw| parse_typed_arg(raw))
        .collect::<Result<Vec<_>>>()?;

    let connection = UnixSocketConnection::connect(&config.client.socket_path)
        .await
        .with_context(|| format!("Failed to reach {:?}", config.client.socket_path))?;
    let transport: Arc<dyn Transport> = Arc::new(connection);
    let session = Arc::new(Session::new(transport, config.call_timeout()));
    debug!("Session {} opened", session.id());

    let proxy = CallProxy::new(
        session,
        config.node.origin_name.as_str(),
        config.node.component.as_str(),
    );
    let outcome = proxy.call(&args.operation, &call_args).await;
    proxy.close().await?;

    let value = outcome.with_context(|| format!("{} failed", args.operation))?;
    println!("{}", CallResult::completed(value.as_ref()).to_json()?);
    Ok(())
}
