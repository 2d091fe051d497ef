//! Integration tests for sessions over Unix socket transports
//!
//! - sequential request/reply over a real socket
//! - a silent peer turns into a timeout and a closed session
//! - server-side hang-up wakes the caller

use bridge_network::{
    Session, Transport, TransportError, UnixSocketConfig, UnixSocketConnection,
    UnixSocketListener,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

async fn listener(name: &str) -> (tempfile::TempDir, UnixSocketListener) {
    let dir = tempdir().unwrap();
    let path = dir.path().join(name);
    let listener = UnixSocketListener::bind(UnixSocketConfig {
        path,
        ..Default::default()
    })
    .await
    .unwrap();
    (dir, listener)
}

async fn session_to(listener: &UnixSocketListener, timeout: Duration) -> Session {
    let connection = UnixSocketConnection::connect(listener.path()).await.unwrap();
    let transport: Arc<dyn Transport> = Arc::new(connection);
    Session::new(transport, timeout)
}

#[tokio::test]
async fn test_session_over_unix_socket() {
    let (_dir, listener) = listener("echo.sock").await;
    let session = session_to(&listener, Duration::from_secs(2)).await;

    let server = tokio::spawn(async move {
        let connection = listener.accept().await.unwrap();
        while let Ok(message) = connection.receive().await {
            let mut reply = message.to_vec();
            reply.reverse();
            connection.send(&reply).await.unwrap();
        }
    });

    assert_eq!(&session.request(b"abc").await.unwrap()[..], b"cba");
    // Empty messages are valid
    assert!(session.request(b"").await.unwrap().is_empty());
    let large = vec![7u8; 256 * 1024];
    assert_eq!(session.request(&large).await.unwrap().len(), large.len());

    session.close().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), server)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_silent_peer_times_out() {
    let (_dir, listener) = listener("silent.sock").await;
    let session = session_to(&listener, Duration::from_millis(50)).await;
    let _held = listener.accept().await.unwrap();

    match session.request(b"hello?").await {
        Err(TransportError::Timeout { timeout_ms, .. }) => assert_eq!(timeout_ms, 50),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_server_hangup_fails_request() {
    let (_dir, listener) = listener("hangup.sock").await;
    let session = session_to(&listener, Duration::from_secs(5)).await;

    let server = tokio::spawn(async move {
        let connection = listener.accept().await.unwrap();
        let _ = connection.receive().await.unwrap();
        connection.close().await.unwrap();
        drop(connection);
    });

    let err = session.request(b"ping").await.unwrap_err();
    assert!(err.is_channel_closed());
    assert!(session.is_closed());
    server.await.unwrap();
}
