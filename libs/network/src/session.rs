//! Request/Reply Session
//!
//! Wraps an established transport and turns it into a strictly sequential
//! "send one request, receive one reply" channel.
//!
//! Replies carry no correlation id, so they are paired with requests purely by
//! order. Three rules keep that pairing sound:
//!
//! - exchanges are serialized by an async mutex, so a second caller waits
//!   instead of interleaving;
//! - every exchange has a deadline; a lost reply becomes
//!   [`TransportError::Timeout`];
//! - a timed-out session is closed, because a late reply would otherwise be
//!   read as the answer to the next request.
//!
//! Closing the session wakes any pending exchange with
//! [`TransportError::ChannelClosed`].

use crate::transports::Transport;
use crate::{Result, TransportError};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// Sequential request/reply channel over a transport
pub struct Session {
    id: String,
    transport: Arc<dyn Transport>,
    exchange_lock: Mutex<()>,
    closed: watch::Sender<bool>,
    timeout: Duration,
}

impl Session {
    /// Wrap a connected transport
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4().simple().to_string(),
            transport,
            exchange_lock: Mutex::new(()),
            closed,
            timeout,
        }
    }

    /// Unique id of this session, used as the envelope session tag
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Send one request and wait for its reply using the default deadline
    pub async fn request(&self, message: &[u8]) -> Result<Bytes> {
        self.request_timeout(message, self.timeout).await
    }

    /// Send one request and wait for its reply
    pub async fn request_timeout(&self, message: &[u8], timeout: Duration) -> Result<Bytes> {
        let mut closed_rx = self.closed.subscribe();
        if *closed_rx.borrow_and_update() {
            return Err(TransportError::channel_closed(format!(
                "session {} already closed",
                self.id
            )));
        }

        let _exchange = tokio::select! {
            guard = self.exchange_lock.lock() => guard,
            _ = closed_rx.wait_for(|closed| *closed) => {
                return Err(TransportError::channel_closed(format!(
                    "session {} closed while waiting for its turn",
                    self.id
                )));
            }
        };

        let started = Instant::now();
        let exchange = async {
            self.transport.send(message).await?;
            self.transport.receive().await
        };

        let outcome = tokio::select! {
            biased;
            _ = async { closed_rx.wait_for(|closed| *closed).await.map(|_| ()) } => {
                Err(TransportError::channel_closed(format!(
                    "session {} closed before reply",
                    self.id
                )))
            }
            result = tokio::time::timeout(timeout, exchange) => match result {
                Ok(reply) => reply,
                Err(_) => {
                    warn!(
                        "Session {} exchange timed out after {:?}, closing",
                        self.id, timeout
                    );
                    self.shutdown().await;
                    Err(TransportError::timeout("request", timeout.as_millis() as u64))
                }
            },
        };

        match &outcome {
            Ok(reply) => debug!(
                "Session {} exchange: {} bytes out, {} bytes back in {:?}",
                self.id,
                message.len(),
                reply.len(),
                started.elapsed()
            ),
            Err(e) if e.is_channel_closed() => {
                self.closed.send_replace(true);
            }
            Err(_) => {}
        }
        outcome
    }

    /// Close the session and its transport
    ///
    /// Pending and future exchanges fail with `ChannelClosed`.
    pub async fn close(&self) -> Result<()> {
        if self.closed.send_replace(true) {
            return Ok(());
        }
        debug!("Closing session {}", self.id);
        self.transport.close().await
    }

    async fn shutdown(&self) {
        if !self.closed.send_replace(true) {
            if let Err(e) = self.transport.close().await {
                warn!("Session {} transport close failed: {}", self.id, e);
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("timeout", &self.timeout)
            .finish()
    }
}
