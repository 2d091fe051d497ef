//! Stub (server endpoint)
//!
//! Turns one raw inbound message into exactly one reply message:
//!
//! ```text
//! raw ─▶ Frame ─┬─ code != INVOKE ─▶ Frame(UNSUPPORTED, empty)
//!               └─ INVOKE ─▶ Envelope ─▶ Invoker ─▶ CallResult ─▶ Envelope ─▶ Frame(INVOKE)
//! ```
//!
//! Every failure past frame classification, including undecodable input, is
//! answered with a failure result. The serve loop only ends when the channel
//! closes.

use crate::invoker::{InvokeOutcome, Invoker};
use crate::{BridgeError, Result};
use bridge_codec::{CallResult, Envelope, FaultKind, Frame, ReplyCode, RequestCode};
use bridge_network::{Transport, TransportError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Counters for one stub
#[derive(Debug, Default)]
pub struct StubStats {
    requests: AtomicU64,
    failures: AtomicU64,
    unsupported: AtomicU64,
    decode_errors: AtomicU64,
}

/// Point-in-time copy of [`StubStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StubStatsSnapshot {
    pub requests: u64,
    pub failures: u64,
    pub unsupported: u64,
    pub decode_errors: u64,
}

impl StubStats {
    pub fn snapshot(&self) -> StubStatsSnapshot {
        StubStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// Server endpoint for one component
pub struct Stub<S> {
    invoker: Invoker<S>,
    component: String,
    handler_timeout: Duration,
    stats: StubStats,
}

impl<S: Send + Sync + 'static> Stub<S> {
    /// Serve `component` with the given invoker
    pub fn new(
        invoker: Invoker<S>,
        component: impl Into<String>,
        handler_timeout: Duration,
    ) -> Self {
        Self {
            invoker,
            component: component.into(),
            handler_timeout,
            stats: StubStats::default(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn invoker(&self) -> &Invoker<S> {
        &self.invoker
    }

    pub fn stats(&self) -> StubStatsSnapshot {
        self.stats.snapshot()
    }

    /// Answer every request on `transport` until the peer goes away
    ///
    /// Requests on one channel are handled strictly one at a time.
    pub async fn serve(&self, transport: &dyn Transport) -> Result<()> {
        let peer = transport.transport_info().peer;
        info!("Stub {} serving peer {:?}", self.component, peer);

        loop {
            let raw = match transport.receive().await {
                Ok(raw) => raw,
                Err(e) if e.is_channel_closed() => {
                    info!("Peer {:?} disconnected from {}", peer, self.component);
                    return Ok(());
                }
                Err(e) => {
                    // A framing error leaves the stream position unknown
                    error!("Stub {} receive failed: {}", self.component, e);
                    return Err(e.into());
                }
            };

            let reply = match self.handle_message(&raw).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!("Stub {} dropped a reply: {}", self.component, e);
                    continue;
                }
            };
            match transport.send(&reply).await {
                Ok(()) => {}
                Err(TransportError::ChannelClosed { .. }) => {
                    info!("Peer {:?} left before its reply was sent", peer);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Produce the encoded reply for one raw inbound message
    pub async fn handle_message(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let reply = match Frame::decode(raw) {
            Ok(frame) => self.handle_frame(frame).await,
            Err(e) => {
                self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Undecodable frame ({} bytes): {}", raw.len(), e);
                self.failure_reply(Envelope::default(), FaultKind::Decode, e.to_string())
            }
        };
        Ok(reply.encode()?)
    }

    /// Produce the reply frame for one request frame
    pub async fn handle_frame(&self, frame: Frame) -> Frame {
        match frame.request_code() {
            Some(RequestCode::Invoke) => {}
            None => {
                self.stats.unsupported.fetch_add(1, Ordering::Relaxed);
                warn!("{}", BridgeError::UnsupportedRequest { code: frame.code });
                return Frame::unsupported();
            }
        }

        let envelope = match Envelope::decode(&frame.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Undecodable envelope: {}", e);
                return self.failure_reply(Envelope::default(), FaultKind::Decode, e.to_string());
            }
        };

        if envelope.is_reply() {
            self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
            return self.failure_reply(
                Envelope {
                    result: None,
                    ..envelope
                },
                FaultKind::Decode,
                "request envelope already carries a result",
            );
        }

        let result = self.dispatch(&envelope).await;
        self.reply(envelope, &result)
    }

    async fn dispatch(&self, envelope: &Envelope) -> CallResult {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        let operation = envelope.operation.as_str();

        if !envelope.target_component.is_empty() && envelope.target_component != self.component {
            self.stats.failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                "{} addressed to component {}, serving {}",
                operation, envelope.target_component, self.component
            );
            return CallResult::failure(
                FaultKind::OperationNotFound,
                format!(
                    "component {} is not served here (serving {})",
                    envelope.target_component, self.component
                ),
            );
        }

        let started = Instant::now();
        let invocation = self
            .invoker
            .invoke(operation, &envelope.arg_types, &envelope.args);
        let outcome = match tokio::time::timeout(self.handler_timeout, invocation).await {
            Ok(outcome) => outcome,
            Err(_) => InvokeOutcome::Failed(BridgeError::timeout(
                operation,
                self.handler_timeout.as_millis() as u64,
            )),
        };

        match outcome {
            InvokeOutcome::Completed(value) => {
                debug!(
                    "{} completed for {} (session {}) in {:?}",
                    operation,
                    envelope.origin_name,
                    envelope.session,
                    started.elapsed()
                );
                CallResult::completed(value.as_ref())
            }
            InvokeOutcome::NotFound(name) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Operation not found: {} (session {})", name, envelope.session);
                let error = BridgeError::not_found(name);
                CallResult::failure(error.fault_kind(), error.to_string())
            }
            InvokeOutcome::Failed(error) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "{} failed (session {}) after {:?}: {}",
                    operation,
                    envelope.session,
                    started.elapsed(),
                    error
                );
                CallResult::failure(error.fault_kind(), error.to_string())
            }
        }
    }

    fn failure_reply(
        &self,
        envelope: Envelope,
        kind: FaultKind,
        message: impl Into<String>,
    ) -> Frame {
        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        self.reply(envelope, &CallResult::failure(kind, message))
    }

    /// Reply frame for `envelope`, always within the frame size limit
    fn reply(&self, envelope: Envelope, result: &CallResult) -> Frame {
        let encoded = envelope
            .clone()
            .into_reply(result)
            .and_then(|reply| reply.encode())
            .and_then(|body| {
                let frame = Frame::new(ReplyCode::Invoke.into(), body);
                frame.check_size().map(|()| frame)
            });

        match encoded {
            Ok(frame) => frame,
            Err(e) => {
                // Drop the echoed arguments and report why
                error!("Reply for {} could not be encoded: {}", envelope.operation, e);
                let stripped = Envelope {
                    arg_types: Vec::new(),
                    args: Vec::new(),
                    result: None,
                    ..envelope
                };
                let fallback = CallResult::failure(
                    FaultKind::Handler,
                    format!("reply could not be encoded: {}", e),
                );
                let body = stripped
                    .into_reply(&fallback)
                    .and_then(|reply| reply.encode())
                    .unwrap_or_default();
                Frame::new(ReplyCode::Invoke.into(), body)
            }
        }
    }
}
