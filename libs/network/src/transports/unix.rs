//! Unix Domain Socket Transport
//!
//! Local IPC transport between a test runner and its companion test service.
//! Messages are framed with a 4-byte big-endian length prefix.

use super::{Transport, TransportInfo, TransportType};
use crate::{Result, TransportError};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Unix socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnixSocketConfig {
    /// Socket path
    pub path: PathBuf,
    /// Maximum message size
    pub max_message_size: usize,
    /// Clean up socket file on drop
    pub cleanup_on_drop: bool,
}

impl Default for UnixSocketConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/bridge/test_service.sock"),
            max_message_size: crate::DEFAULT_MAX_MESSAGE_SIZE,
            cleanup_on_drop: true,
        }
    }
}

/// Listening side of a Unix socket
pub struct UnixSocketListener {
    config: UnixSocketConfig,
    listener: UnixListener,
}

impl UnixSocketListener {
    /// Bind to the configured path, replacing a stale socket file
    pub async fn bind(config: UnixSocketConfig) -> Result<Self> {
        if config.path.exists() {
            std::fs::remove_file(&config.path).map_err(|e| {
                TransportError::network_with_source("Failed to remove existing socket", e)
            })?;
        }

        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TransportError::network_with_source("Failed to create socket directory", e)
            })?;
        }

        let listener = UnixListener::bind(&config.path)
            .map_err(|e| TransportError::network_with_source("Failed to bind Unix socket", e))?;

        info!("Unix socket listening on: {:?}", config.path);
        Ok(Self { config, listener })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Accept the next incoming connection
    pub async fn accept(&self) -> Result<UnixSocketConnection> {
        let (stream, _) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::network_with_source("Failed to accept connection", e))?;

        debug!("Accepted Unix socket connection");
        Ok(UnixSocketConnection::new(stream, self.config.clone()))
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        if self.config.cleanup_on_drop && self.config.path.exists() {
            let _ = std::fs::remove_file(&self.config.path);
        }
    }
}

/// Connected Unix socket
///
/// Read and write halves are locked independently so a pending receive never
/// blocks `close`.
pub struct UnixSocketConnection {
    reader: Mutex<(OwnedReadHalf, BytesMut)>,
    writer: Mutex<OwnedWriteHalf>,
    config: UnixSocketConfig,
    closed: AtomicBool,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl UnixSocketConnection {
    /// Create new connection from stream
    pub fn new(stream: UnixStream, config: UnixSocketConfig) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: Mutex::new((read_half, BytesMut::with_capacity(64 * 1024))),
            writer: Mutex::new(write_half),
            config,
            closed: AtomicBool::new(false),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    /// Connect to a Unix socket server
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).await.map_err(|e| {
            TransportError::connection_with_source(
                "Failed to connect to Unix socket",
                Some(&path.display().to_string()),
                e,
            )
        })?;

        let config = UnixSocketConfig {
            path: path.to_path_buf(),
            cleanup_on_drop: false,
            ..Default::default()
        };

        debug!("Connected to Unix socket: {:?}", path);
        Ok(Self::new(stream, config))
    }
}

#[async_trait]
impl Transport for UnixSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::channel_closed("Unix socket closed locally"));
        }
        if data.len() > self.config.max_message_size {
            return Err(TransportError::protocol(format!(
                "Message size {} exceeds maximum {}",
                data.len(),
                self.config.max_message_size
            )));
        }

        let mut framed = Vec::with_capacity(4 + data.len());
        framed.extend_from_slice(&(data.len() as u32).to_be_bytes());
        framed.extend_from_slice(data);

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&framed)
            .await
            .map_err(|e| TransportError::from_io("Failed to write message", e))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::from_io("Failed to flush", e))?;

        self.bytes_sent
            .fetch_add(framed.len() as u64, Ordering::Relaxed);
        debug!("Sent {} bytes via Unix socket", data.len());
        Ok(())
    }

    async fn receive(&self) -> Result<Bytes> {
        let mut guard = self.reader.lock().await;
        let (stream, buffer) = &mut *guard;

        let mut len_bytes = [0u8; 4];
        stream
            .read_exact(&mut len_bytes)
            .await
            .map_err(|e| TransportError::from_io("Failed to read length prefix", e))?;

        let message_len = u32::from_be_bytes(len_bytes) as usize;
        if message_len > self.config.max_message_size {
            return Err(TransportError::protocol(format!(
                "Message size {} exceeds maximum {}",
                message_len, self.config.max_message_size
            )));
        }

        buffer.clear();
        buffer.resize(message_len, 0);
        stream
            .read_exact(&mut buffer[..])
            .await
            .map_err(|e| TransportError::from_io("Failed to read data", e))?;

        let message = buffer.split_to(message_len).freeze();
        self.bytes_received
            .fetch_add((4 + message.len()) as u64, Ordering::Relaxed);
        debug!("Received {} bytes via Unix socket", message.len());
        Ok(message)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        writer
            .shutdown()
            .await
            .map_err(|e| TransportError::network_with_source("Failed to shutdown stream", e))?;
        debug!("Unix socket connection closed");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn transport_info(&self) -> TransportInfo {
        TransportInfo {
            transport_type: TransportType::Unix,
            peer: Some(self.config.path.display().to_string()),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_unix_socket_transport() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");

        let config = UnixSocketConfig {
            path: socket_path.clone(),
            ..Default::default()
        };

        let listener = UnixSocketListener::bind(config).await.unwrap();

        let client_task = tokio::spawn(async move {
            let client = UnixSocketConnection::connect(&socket_path).await.unwrap();
            client.send(b"Hello, server!").await.unwrap();
            let reply = client.receive().await.unwrap();
            assert_eq!(&reply[..], b"Hello, client!");
        });

        let conn = listener.accept().await.unwrap();
        let data = conn.receive().await.unwrap();
        assert_eq!(&data[..], b"Hello, server!");
        conn.send(b"Hello, client!").await.unwrap();

        client_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_close_surfaces_as_channel_closed() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("close.sock");
        let listener = UnixSocketListener::bind(UnixSocketConfig {
            path: socket_path.clone(),
            ..Default::default()
        })
        .await
        .unwrap();

        let client = UnixSocketConnection::connect(&socket_path).await.unwrap();
        let server_side = listener.accept().await.unwrap();

        client.close().await.unwrap();
        assert!(!client.is_healthy());
        assert!(server_side.receive().await.unwrap_err().is_channel_closed());
        assert!(client.send(b"late").await.unwrap_err().is_channel_closed());
    }

    #[tokio::test]
    async fn test_oversized_message_rejected() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("limit.sock");
        let listener = UnixSocketListener::bind(UnixSocketConfig {
            path: socket_path.clone(),
            max_message_size: 8,
            cleanup_on_drop: true,
        })
        .await
        .unwrap();

        let client = UnixSocketConnection::connect(&socket_path).await.unwrap();
        let server_side = listener.accept().await.unwrap();

        client.send(&[0u8; 32]).await.unwrap();
        assert!(matches!(
            server_side.receive().await,
            Err(TransportError::Protocol { .. })
        ));
    }
}
