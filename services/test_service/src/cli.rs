//! Command-line argument helpers for `bridge-call`

use anyhow::{Context, Result};
use bridge_codec::ArgValue;
use bridge_config::BridgeConfig;
use std::path::{Path, PathBuf};

/// Client settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct ClientOverrides {
    pub socket: Option<PathBuf>,
    pub component: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Load the configuration, apply `overrides` and validate the result
pub fn client_config(path: Option<&Path>, overrides: ClientOverrides) -> Result<BridgeConfig> {
    let mut config = BridgeConfig::load(path)?;
    if let Some(socket) = overrides.socket {
        config.client.socket_path = socket;
    }
    if let Some(component) = overrides.component {
        config.node.component = component;
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        config.client.call_timeout_ms = timeout_ms;
    }
    config.expand_env_vars()?;
    config.validate()?;
    Ok(config)
}

/// Parse a `TAG:VALUE` argument, e.g. `string:K`, `number:Infinity`,
/// `Uint8Array:1,2,3`
///
/// Only the first `:` separates tag from value.
pub fn parse_typed_arg(raw: &str) -> Result<ArgValue> {
    let (tag, text) = raw
        .split_once(':')
        .with_context(|| format!("argument {:?} is not TAG:VALUE", raw))?;
    ArgValue::from_wire(tag, text).with_context(|| format!("argument {:?}", raw))
}
