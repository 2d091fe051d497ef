//! # Bridge Test Service
//!
//! Companion process for cross-device tests: serves the key-value test
//! operations over a Unix socket so a test on another device can drive them
//! through a [`KvRemote`](bridge_rpc::KvRemote).

pub mod cli;
pub mod kv;
pub mod server;

pub use kv::{kv_registry, register_kv_operations, KvContext};
pub use server::{kv_stub, TestService};

/// Install the tracing subscriber used by both binaries
///
/// `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
