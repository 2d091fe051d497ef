//! Bridge Network Infrastructure
//!
//! Transports that move length-delimited messages between a test runner and
//! its companion test service, plus the [`Session`] that turns a transport into
//! a sequential request/reply channel with deadlines and explicit close.
//!
//! Channel discovery and connection setup happen elsewhere; everything here
//! starts from an already connected transport.

pub mod error;
pub mod session;
pub mod transports;

pub use error::{Result, TransportError};
pub use session::Session;
pub use transports::{
    MemoryTransport, Transport, TransportInfo, TransportType, UnixSocketConfig,
    UnixSocketConnection, UnixSocketListener,
};

pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16MB
