//! Bridge Configuration Module
//!
//! Loads [`BridgeConfig`] from an optional TOML file, then applies
//! `BRIDGE__SECTION__KEY` environment overrides.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// File consulted when no explicit path is given
pub const DEFAULT_CONFIG_PATH: &str = "config/bridge.toml";

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BRIDGE";

const DEFAULT_SOCKET_PATH: &str = "/tmp/bridge/test_service.sock";

/// Main bridge configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    pub node: NodeConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

/// Identity stamped into every outgoing envelope
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// Origin name of this side of the bridge
    pub origin_name: String,
    /// Component addressed on the remote side
    pub component: String,
}

/// Test service settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    /// Upper bound for a single handler invocation
    pub handler_timeout_ms: u64,
}

/// Caller settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub socket_path: PathBuf,
    /// Deadline for one request/reply exchange
    pub call_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            origin_name: "bridge-local".to_string(),
            component: "kvStoreService".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            handler_timeout_ms: 10_000,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            call_timeout_ms: 15_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration with environment overrides
    ///
    /// An explicit `path` must exist. Without one, `config/bridge.toml` is
    /// used when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        if file.exists() {
            info!("Loading bridge config: {:?}", file);
        } else {
            debug!("No config file at {:?}, using defaults", file);
        }

        let config = Config::builder()
            .add_source(File::from(file).required(required))
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut bridge: BridgeConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        bridge.expand_env_vars()?;
        bridge.validate()?;
        Ok(bridge)
    }

    /// Expand `~` and `$VAR` in socket paths
    pub fn expand_env_vars(&mut self) -> Result<()> {
        self.server.socket_path = expand_path(&self.server.socket_path)
            .context("Failed to expand server socket path")?;
        self.client.socket_path = expand_path(&self.client.socket_path)
            .context("Failed to expand client socket path")?;
        Ok(())
    }

    /// Reject settings that would make every call fail
    pub fn validate(&self) -> Result<()> {
        if self.node.component.trim().is_empty() {
            bail!("node.component must not be empty");
        }
        if self.server.socket_path.as_os_str().is_empty() {
            bail!("server.socket_path must not be empty");
        }
        if self.client.socket_path.as_os_str().is_empty() {
            bail!("client.socket_path must not be empty");
        }
        if self.server.handler_timeout_ms == 0 {
            bail!("server.handler_timeout_ms must be greater than zero");
        }
        if self.client.call_timeout_ms == 0 {
            bail!("client.call_timeout_ms must be greater than zero");
        }
        // A caller that gives up first would see a timeout for a call the
        // service still completes.
        if self.client.call_timeout_ms < self.server.handler_timeout_ms {
            bail!(
                "client.call_timeout_ms ({}) is shorter than server.handler_timeout_ms ({})",
                self.client.call_timeout_ms,
                self.server.handler_timeout_ms
            );
        }
        Ok(())
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.server.handler_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.client.call_timeout_ms)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).with_context(|| format!("cannot expand {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("bridge.toml");

        let config_content = r#"
[node]
origin_name = "device-a"
component = "kvStoreService"

[server]
socket_path = "/tmp/test/service.sock"
handler_timeout_ms = 2000

[client]
call_timeout_ms = 3000

[logging]
level = "debug"
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = BridgeConfig::load(Some(&config_path)).unwrap();

        assert_eq!(config.node.origin_name, "device-a");
        assert_eq!(config.server.socket_path, PathBuf::from("/tmp/test/service.sock"));
        assert_eq!(config.handler_timeout(), Duration::from_millis(2000));
        assert_eq!(config.call_timeout(), Duration::from_millis(3000));
        assert_eq!(config.logging.level, "debug");
        // Unspecified keys keep their defaults
        assert_eq!(config.client.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(BridgeConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_environment_override() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("bridge.toml");
        fs::write(&config_path, "[server]\nhandler_timeout_ms = 500\n").unwrap();

        std::env::set_var("BRIDGECFGTEST__SERVER__HANDLER_TIMEOUT_MS", "750");
        std::env::set_var("BRIDGECFGTEST__NODE__COMPONENT", "rdbStoreService");
        let config = BridgeConfig::load_with_prefix(Some(&config_path), "BRIDGECFGTEST").unwrap();
        std::env::remove_var("BRIDGECFGTEST__SERVER__HANDLER_TIMEOUT_MS");
        std::env::remove_var("BRIDGECFGTEST__NODE__COMPONENT");

        assert_eq!(config.server.handler_timeout_ms, 750);
        assert_eq!(config.node.component, "rdbStoreService");
    }

    #[test]
    fn test_socket_path_expansion() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("bridge.toml");
        std::env::set_var("BRIDGE_CFG_TEST_SOCKDIR", "/var/run/bridge");
        fs::write(
            &config_path,
            "[server]\nsocket_path = \"$BRIDGE_CFG_TEST_SOCKDIR/svc.sock\"\n",
        )
        .unwrap();

        let config = BridgeConfig::load_with_prefix(Some(&config_path), "BRIDGECFGEXPAND").unwrap();
        assert_eq!(config.server.socket_path, PathBuf::from("/var/run/bridge/svc.sock"));
    }

    #[test]
    fn test_validation() {
        assert!(BridgeConfig::default().validate().is_ok());

        let mut config = BridgeConfig::default();
        config.server.handler_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.node.component = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.client.call_timeout_ms = 100;
        config.server.handler_timeout_ms = 200;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("shorter than"));
    }

    #[test]
    fn test_toml_rendering_loads_back() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("rendered.toml");

        let mut original = BridgeConfig::default();
        original.node.origin_name = "device-b".to_string();
        fs::write(&config_path, original.to_toml_string().unwrap()).unwrap();

        let loaded = BridgeConfig::load_with_prefix(Some(&config_path), "BRIDGECFGRENDER").unwrap();
        assert_eq!(loaded, original);
    }
}
