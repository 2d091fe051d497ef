//! Transport Error Types
//!
//! Error handling for bridge channels: socket failures, framing violations,
//! closed channels and expired request/reply exchanges.

use thiserror::Error;

/// Main transport error type
#[derive(Error, Debug)]
pub enum TransportError {
    /// Socket-level I/O failures
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection establishment errors
    #[error("Connection error: {message} (remote: {remote:?})")]
    Connection {
        message: String,
        remote: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Framing errors (oversized or malformed length-delimited messages)
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Request/reply exchange exceeded its deadline
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Channel was closed locally or by the peer
    #[error("Channel closed: {context}")]
    ChannelClosed { context: String },
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// Create a network error with source
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        remote: Option<&str>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            remote: remote.map(|s| s.to_string()),
            source: Some(Box::new(source)),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a channel closed error
    pub fn channel_closed(context: impl Into<String>) -> Self {
        Self::ChannelClosed {
            context: context.into(),
        }
    }

    /// Map a read/write failure, treating end-of-stream as a closed channel
    pub fn from_io(context: &str, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => {
                Self::channel_closed(format!("{}: {}", context, error))
            }
            _ => Self::network_with_source(context.to_string(), error),
        }
    }

    pub fn is_channel_closed(&self) -> bool {
        matches!(self, TransportError::ChannelClosed { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_eof_maps_to_channel_closed() {
        let err = TransportError::from_io(
            "read length prefix",
            io::Error::new(io::ErrorKind::UnexpectedEof, "eof"),
        );
        assert!(err.is_channel_closed());
        assert!(err.to_string().contains("read length prefix"));
    }

    #[test]
    fn test_other_io_maps_to_network() {
        let err = TransportError::from_io(
            "write",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, TransportError::Network { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
