//! # Bridge Codec
//!
//! ## Purpose
//!
//! Wire format of the cross-device test-invocation bridge: the code-tagged
//! [`Frame`] moved by the transport, the [`Envelope`] it carries, the typed
//! [`ArgValue`] arguments and the JSON [`CallResult`] stored in a reply.
//!
//! ## Architecture Role
//!
//! ```text
//! call proxy ──encode──▶ Frame(INVOKE, Envelope) ──transport──▶ stub
//!      ▲                                                         │
//!      └──decode── Frame(INVOKE, Envelope + CallResult) ◀────────┘
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Transport or session handling (belongs in `bridge-network`)
//! - Operation dispatch (belongs in `bridge-rpc`)

pub mod constants;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod result;
pub mod value;
pub mod wire;

pub use constants::*;
pub use envelope::Envelope;
pub use error::{CoercionError, DecodeError, EncodeError};
pub use frame::{Frame, ReplyCode, RequestCode};
pub use result::{CallResult, FaultKind, RemoteFault};
pub use value::{ArgTag, ArgValue, MIN_NUMBER};
