//! # Bridge RPC
//!
//! ## Purpose
//!
//! Lets a test on one device invoke a named operation on a companion test
//! service on another device and get the result back.
//!
//! ## Architecture Role
//!
//! ```text
//! CallProxy ──Session──▶ Stub ──▶ Invoker ──▶ Registry[name] ──▶ handler(state, args)
//! ```
//!
//! - [`RegistryBuilder`] collects handlers at startup; the frozen
//!   [`Registry`] is shared read-only.
//! - [`Invoker`] owns the server-side state passed to every handler.
//! - [`Stub`] answers one request per inbound message and never stops on a
//!   bad request.
//! - [`CallProxy`] serializes calls over its [`Session`](bridge_network::Session)
//!   and surfaces failure results as [`BridgeError::Remote`].
//! - [`KvRemote`] is the typed client for the key-value test operations.

pub mod error;
pub mod invoker;
pub mod operations;
pub mod proxy;
pub mod registry;
pub mod stub;

pub use error::{BridgeError, RemoteCallError, Result};
pub use invoker::{InvokeOutcome, Invoker};
pub use operations::{KvRemote, KvValueType, SecurityLevel, SyncMode, KV_STORE_COMPONENT};
pub use proxy::CallProxy;
pub use registry::{Args, Handler, HandlerResult, Registry, RegistryBuilder};
pub use stub::{Stub, StubStatsSnapshot};
