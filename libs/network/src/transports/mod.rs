//! Bridge Transport Layer
//!
//! A transport moves opaque, length-delimited messages between the two ends
//! of an already established channel. Connection discovery is out of scope:
//! the bridge only ever sees a connected transport.

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

pub mod memory;
pub mod unix;

pub use memory::MemoryTransport;
pub use unix::{UnixSocketConfig, UnixSocketConnection, UnixSocketListener};

/// Message-oriented transport used by sessions and stubs
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one complete message
    async fn send(&self, message: &[u8]) -> Result<()>;

    /// Receive the next complete message
    ///
    /// Returns [`crate::TransportError::ChannelClosed`] once the peer has
    /// gone away.
    async fn receive(&self) -> Result<Bytes>;

    /// Stop sending; the peer observes end-of-stream
    async fn close(&self) -> Result<()>;

    /// Check if transport is usable
    fn is_healthy(&self) -> bool;

    /// Get transport-specific information
    fn transport_info(&self) -> TransportInfo;
}

/// Transport type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// Unix domain socket
    Unix,
    /// In-process channel pair
    Memory,
}

/// Transport information for diagnostics
#[derive(Debug, Clone)]
pub struct TransportInfo {
    pub transport_type: TransportType,
    pub peer: Option<String>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}
