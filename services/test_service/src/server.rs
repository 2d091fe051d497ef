//! Test service server
//!
//! Accepts connections on a Unix socket and serves each on its own task.
//! Requests within one connection are answered in order by the shared stub.

use crate::kv::{kv_registry, KvContext};
use anyhow::{Context, Result};
use bridge_config::BridgeConfig;
use bridge_network::{UnixSocketConfig, UnixSocketListener};
use bridge_rpc::{Invoker, Stub};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Stub serving the key-value operations over a fresh context
pub fn kv_stub(component: &str, handler_timeout: Duration) -> Result<Stub<KvContext>> {
    let registry = kv_registry().context("Failed to register KV operations")?;
    info!(
        "Registered {} operations for {}: {:?}",
        registry.len(),
        component,
        registry.names()
    );
    let invoker = Invoker::new(registry, Arc::new(KvContext::new()));
    Ok(Stub::new(invoker, component, handler_timeout))
}

/// Unix socket test service
pub struct TestService {
    stub: Arc<Stub<KvContext>>,
    listener: UnixSocketListener,
}

impl TestService {
    /// Bind the configured socket
    pub async fn bind(config: &BridgeConfig) -> Result<Self> {
        let stub = kv_stub(&config.node.component, config.handler_timeout())?;
        let listener = UnixSocketListener::bind(UnixSocketConfig {
            path: config.server.socket_path.clone(),
            ..Default::default()
        })
        .await
        .with_context(|| format!("Failed to bind {:?}", config.server.socket_path))?;

        Ok(Self {
            stub: Arc::new(stub),
            listener,
        })
    }

    pub fn stub(&self) -> &Arc<Stub<KvContext>> {
        &self.stub
    }

    pub fn socket_path(&self) -> &Path {
        self.listener.path()
    }

    /// Accept and serve connections until the task is dropped
    pub async fn run(&self) -> Result<()> {
        info!(
            "Test service for {} accepting on {:?}",
            self.stub.component(),
            self.socket_path()
        );

        loop {
            let connection = match self.listener.accept().await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            let stub = self.stub.clone();
            tokio::spawn(async move {
                if let Err(e) = stub.serve(&connection).await {
                    error!("Connection ended with error: {}", e);
                }
                let stats = stub.stats();
                info!(
                    "Connection done; totals: {} requests, {} failures, {} unsupported",
                    stats.requests, stats.failures, stats.unsupported
                );
            });
        }
    }
}
