//! Bridge Error Types
//!
//! One taxonomy for both ends of a call. The stub folds every variant into a
//! failure result with a [`FaultKind`]; the proxy lifts a failure result back
//! into [`BridgeError::Remote`].

use bridge_codec::{CoercionError, DecodeError, EncodeError, FaultKind};
use bridge_network::TransportError;
use std::fmt;
use thiserror::Error;

/// Main bridge error type
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Inbound bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Outbound message could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Request code other than INVOKE
    #[error("Unsupported request code {code:#x}")]
    UnsupportedRequest { code: u32 },

    /// No handler registered under the requested name
    #[error("Operation not found: {name}")]
    OperationNotFound { name: String },

    /// An argument's text does not parse under its type tag
    #[error("Argument {index} rejected: {source}")]
    ArgumentCoercion {
        index: usize,
        #[source]
        source: CoercionError,
    },

    /// Handler returned an error or panicked
    #[error("Handler {operation} failed: {message}")]
    Handler { operation: String, message: String },

    /// Channel closed before the reply arrived
    #[error("Channel closed: {context}")]
    ChannelClosed { context: String },

    /// No reply within the deadline
    #[error("Timeout: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Any other transport failure
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// Remote side reported a failure result
    #[error(transparent)]
    Remote(#[from] RemoteCallError),

    /// Two handlers registered under one name
    #[error("Operation {name} registered twice")]
    DuplicateOperation { name: String },
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn handler(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::OperationNotFound { name: name.into() }
    }

    /// Fault category reported on the wire for this error
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            BridgeError::Decode(_) => FaultKind::Decode,
            BridgeError::UnsupportedRequest { .. } => FaultKind::UnsupportedRequest,
            BridgeError::OperationNotFound { .. } => FaultKind::OperationNotFound,
            BridgeError::ArgumentCoercion { .. } => FaultKind::ArgumentCoercion,
            BridgeError::Timeout { .. } => FaultKind::Timeout,
            BridgeError::Remote(remote) => remote.kind,
            BridgeError::Handler { .. }
            | BridgeError::Encode(_)
            | BridgeError::ChannelClosed { .. }
            | BridgeError::Transport(_)
            | BridgeError::DuplicateOperation { .. } => FaultKind::Handler,
        }
    }

    pub fn is_channel_closed(&self) -> bool {
        matches!(self, BridgeError::ChannelClosed { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout { .. })
    }

    /// Remote failure detail, if the far side reported one
    pub fn remote(&self) -> Option<&RemoteCallError> {
        match self {
            BridgeError::Remote(remote) => Some(remote),
            _ => None,
        }
    }

    /// True for a remote "no such operation" failure
    pub fn is_operation_not_found(&self) -> bool {
        match self {
            BridgeError::OperationNotFound { .. } => true,
            BridgeError::Remote(remote) => remote.kind == FaultKind::OperationNotFound,
            _ => false,
        }
    }
}

impl From<TransportError> for BridgeError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::ChannelClosed { context } => BridgeError::ChannelClosed { context },
            TransportError::Timeout {
                operation,
                timeout_ms,
            } => BridgeError::Timeout {
                operation,
                timeout_ms,
            },
            other => BridgeError::Transport(other),
        }
    }
}

/// Failure result returned by the remote side of a call
#[derive(Debug, Clone, PartialEq, Error)]
pub struct RemoteCallError {
    pub operation: String,
    pub kind: FaultKind,
    pub message: String,
    /// The `result` field as sent, normally the failure sentinel `-1`
    pub sentinel: serde_json::Value,
}

impl fmt::Display for RemoteCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Remote call {} failed ({}, result {}): {}",
            self.operation, self.kind, self.sentinel, self.message
        )
    }
}
