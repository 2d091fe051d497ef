//! Call Proxy (client endpoint)
//!
//! Builds the request envelope, runs one exchange on the session and turns
//! the reply's result into a value or a typed error. A failure result is
//! never reported as success.

use crate::{BridgeError, RemoteCallError, Result};
use bridge_codec::{ArgValue, DecodeError, Envelope, Frame, ReplyCode, RequestCode};
use bridge_network::{Session, TransportError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Client endpoint bound to one session and one remote component
#[derive(Debug, Clone)]
pub struct CallProxy {
    session: Arc<Session>,
    origin_name: String,
    component: String,
}

impl CallProxy {
    pub fn new(
        session: Arc<Session>,
        origin_name: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            session,
            origin_name: origin_name.into(),
            component: component.into(),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Call `operation` with the session's default deadline
    pub async fn call(&self, operation: &str, args: &[ArgValue]) -> Result<Option<ArgValue>> {
        self.call_timeout(operation, args, self.session.timeout())
            .await
    }

    /// Call `operation`, waiting at most `timeout` for the reply
    pub async fn call_timeout(
        &self,
        operation: &str,
        args: &[ArgValue],
        timeout: Duration,
    ) -> Result<Option<ArgValue>> {
        let envelope = Envelope::request(
            self.origin_name.as_str(),
            self.component.as_str(),
            operation,
            self.session.id(),
            args,
        );
        let request = Frame::invoke(envelope.encode()?).encode()?;

        let started = Instant::now();
        let raw = self
            .session
            .request_timeout(&request, timeout)
            .await
            .map_err(|e| match e {
                TransportError::Timeout { timeout_ms, .. } => {
                    BridgeError::timeout(operation, timeout_ms)
                }
                other => BridgeError::from(other),
            })?;

        let outcome = self.read_reply(operation, &raw);
        debug!(
            "{} on session {} returned in {:?} (ok: {})",
            operation,
            self.session.id(),
            started.elapsed(),
            outcome.is_ok()
        );
        outcome
    }

    fn read_reply(&self, operation: &str, raw: &[u8]) -> Result<Option<ArgValue>> {
        let frame = Frame::decode(raw)?;
        match frame.reply_code() {
            Some(ReplyCode::Invoke) => {}
            Some(ReplyCode::Unsupported) => {
                return Err(BridgeError::UnsupportedRequest {
                    code: RequestCode::Invoke.into(),
                })
            }
            None => {
                return Err(DecodeError::malformed_result(format!(
                    "unexpected reply code {:#x}",
                    frame.code
                ))
                .into())
            }
        }

        let reply = Envelope::decode(&frame.body)?;
        // An empty operation means the stub could not read the request and
        // answered with a bare decode failure.
        if !reply.operation.is_empty()
            && (reply.operation != operation || reply.session != self.session.id())
        {
            warn!(
                "Reply for {} (session {}) does not match call {} (session {})",
                reply.operation,
                reply.session,
                operation,
                self.session.id()
            );
            return Err(DecodeError::malformed_result(format!(
                "reply belongs to {} on session {}",
                reply.operation, reply.session
            ))
            .into());
        }

        let result = reply
            .call_result()
            .ok_or_else(|| DecodeError::malformed_result("reply carries no result"))??;

        if let Some(fault) = result.fault() {
            return Err(RemoteCallError {
                operation: operation.to_string(),
                kind: fault.kind,
                message: fault.message,
                sentinel: result.result.clone(),
            }
            .into());
        }

        result
            .value()
            .map_err(|e| DecodeError::malformed_result(format!("return value: {}", e)).into())
    }

    /// Close the underlying session; pending calls fail with `ChannelClosed`
    pub async fn close(&self) -> Result<()> {
        Ok(self.session.close().await?)
    }
}
