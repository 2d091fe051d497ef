//! # Bridge Configuration
//!
//! Settings shared by the test service and its callers: who we are on the
//! wire, where the Unix socket lives, and how long calls may take.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_config::BridgeConfig;
//!
//! let config = BridgeConfig::load(None).expect("configuration");
//! println!("serving {} on {:?}", config.node.component, config.server.socket_path);
//! ```

pub mod bridge_config;

pub use bridge_config::{
    BridgeConfig, ClientConfig, LoggingConfig, NodeConfig, ServerConfig, DEFAULT_CONFIG_PATH,
    ENV_PREFIX,
};
