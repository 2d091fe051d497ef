//! In-process transport pair
//!
//! Two connected endpoints backed by bounded tokio channels. Used to run a
//! stub and a call proxy inside one process, mainly in tests.

use super::{Transport, TransportInfo, TransportType};
use crate::{Result, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// One end of an in-memory channel
pub struct MemoryTransport {
    name: String,
    outbound: Mutex<Option<mpsc::Sender<Bytes>>>,
    inbound: tokio::sync::Mutex<mpsc::Receiver<Bytes>>,
    closed: AtomicBool,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl MemoryTransport {
    /// Create two connected endpoints, each buffering up to `capacity` messages
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel(capacity.max(1));
        let (b_tx, b_rx) = mpsc::channel(capacity.max(1));
        (Self::new("memory-a", a_tx, b_rx), Self::new("memory-b", b_tx, a_rx))
    }

    fn new(name: &str, outbound: mpsc::Sender<Bytes>, inbound: mpsc::Receiver<Bytes>) -> Self {
        Self {
            name: name.to_string(),
            outbound: Mutex::new(Some(outbound)),
            inbound: tokio::sync::Mutex::new(inbound),
            closed: AtomicBool::new(false),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, message: &[u8]) -> Result<()> {
        // Clone out of the lock so no guard is held across the await
        let sender = self
            .outbound
            .lock()
            .clone()
            .ok_or_else(|| {
                TransportError::channel_closed(format!("{} closed locally", self.name))
            })?;

        sender
            .send(Bytes::copy_from_slice(message))
            .await
            .map_err(|_| TransportError::channel_closed(format!("{} peer dropped", self.name)))?;

        self.bytes_sent.fetch_add(message.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn receive(&self) -> Result<Bytes> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(message) => {
                self.bytes_received
                    .fetch_add(message.len() as u64, Ordering::Relaxed);
                Ok(message)
            }
            None => Err(TransportError::channel_closed(format!(
                "{} peer closed",
                self.name
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.outbound.lock().take();
        debug!("{} closed", self.name);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn transport_info(&self) -> TransportInfo {
        TransportInfo {
            transport_type: TransportType::Memory,
            peer: Some(self.name.clone()),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}
