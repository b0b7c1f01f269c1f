//! Per-connection protocol loop.
//!
//! # State machine
//!
//! ```text
//! Open ─► AwaitMessage ─► Processing ─► Respond ─┐
//!              ▲                │                │
//!              └────────────────┴────────────────┘
//!              │ EOF / read error / decode error / write error
//!              ▼
//!            Closed
//! ```
//!
//! - **AwaitMessage**: one `read()` of at most [`MAX_MESSAGE_SIZE`] bytes.
//!   Whatever that read returns is the whole message; there is no framing and
//!   no reassembly.  Zero bytes means the terminal hung up.
//! - **Processing**: decode, then [`OrderService::dispatch`].  A decode error
//!   closes the connection without a reply.  A rejected or unappliable order
//!   and an unknown message type send nothing and go back to waiting.
//! - **Respond**: one `write_all()` of the encoded reply.  A write error closes
//!   the connection.
//! - **Closed**: the stream is dropped and the registry entry removed on every
//!   path out of the loop.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use handy_core::{decode_message, encode_response, ProtocolError, MAX_MESSAGE_SIZE};

use crate::application::{ConnectionGuard, Dispatch, OrderService, SharedRegistry};

/// Why a connection loop ended abnormally.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Runs the protocol loop for one terminal until it disconnects.
///
/// This is the body of every per-connection task spawned by the acceptor.  It
/// registers the peer, runs [`serve_connection`], logs how the session ended,
/// and then drops both the stream and the registry entry.
///
/// Generic over the stream type so tests can drive it with in-memory duplex
/// pipes instead of real sockets.
pub async fn handle_connection<S>(
    mut stream: S,
    peer_addr: SocketAddr,
    service: Arc<OrderService>,
    registry: SharedRegistry,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (_guard, open) = ConnectionGuard::register(&registry, peer_addr);
    info!("terminal connected: {peer_addr} ({open} open)");

    match serve_connection(&mut stream, peer_addr, &service).await {
        Ok(()) => info!("terminal {peer_addr} disconnected"),
        Err(e) => warn!("terminal {peer_addr} closed with error: {e}"),
    }
}

/// The read → dispatch → write loop.
///
/// Returns `Ok(())` when the peer closes the connection cleanly.
///
/// # Errors
///
/// Returns [`ConnectionError`] on a read/write failure or an undecodable
/// message.  The caller closes the connection either way.
pub async fn serve_connection<S>(
    stream: &mut S,
    peer_addr: SocketAddr,
    service: &OrderService,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];

    loop {
        let n = stream.read(&mut buf).await.map_err(ConnectionError::Read)?;
        if n == 0 {
            return Ok(());
        }

        let message = decode_message(&buf[..n])?;
        debug!("{peer_addr} → {}", message.kind());

        match service.dispatch(message).await {
            Dispatch::Reply(response) => {
                let bytes = encode_response(&response)?;
                if bytes.len() > MAX_MESSAGE_SIZE {
                    // Terminals read once with the same bound and will see a
                    // truncated reply.
                    warn!(
                        "{peer_addr}: reply of {} bytes exceeds the {MAX_MESSAGE_SIZE}-byte read bound",
                        bytes.len()
                    );
                }
                stream
                    .write_all(&bytes)
                    .await
                    .map_err(ConnectionError::Write)?;
            }
            Dispatch::Rejected(reason) => {
                debug!("{peer_addr}: order rejected without reply: {reason}");
            }
            Dispatch::Failed(e) => {
                warn!("{peer_addr}: order not applied: {e}");
            }
            Dispatch::Ignored => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use handy_core::{OrderLedger, ServerResponse};
    use tokio::io::{duplex, DuplexStream};

    use crate::application::connection_registry::lock_registry;
    use crate::application::ConnectionRegistry;

    const READ_TIMEOUT: Duration = Duration::from_secs(2);

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 2], port))
    }

    /// Starts a handler on one end of an in-memory pipe and returns the other.
    fn start(
        service: &Arc<OrderService>,
        registry: &SharedRegistry,
        port: u16,
    ) -> (DuplexStream, tokio::task::JoinHandle<()>) {
        let (client, server) = duplex(MAX_MESSAGE_SIZE * 4);
        let handle = tokio::spawn(handle_connection(
            server,
            peer(port),
            Arc::clone(service),
            Arc::clone(registry),
        ));
        (client, handle)
    }

    async fn request(client: &mut DuplexStream, json: &str) -> ServerResponse {
        client.write_all(json.as_bytes()).await.unwrap();
        let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
        let n = tokio::time::timeout(READ_TIMEOUT, client.read(&mut buf))
            .await
            .expect("reply must arrive")
            .unwrap();
        serde_json::from_slice(&buf[..n]).expect("reply must be JSON")
    }

    fn setup() -> (Arc<OrderService>, SharedRegistry) {
        (
            Arc::new(OrderService::new(Arc::new(OrderLedger::new()))),
            ConnectionRegistry::shared(),
        )
    }

    #[tokio::test]
    async fn test_order_then_inquiry_over_one_connection() {
        // Arrange
        let (service, registry) = setup();
        let (mut client, _handle) = start(&service, &registry, 40001);

        // Act
        let ack = request(
            &mut client,
            r#"{"type":"order","table":"5","items":[["焼き鳥",2]],"timestamp":1000}"#,
        )
        .await;
        let orders = request(&mut client, r#"{"type":"inquiry"}"#).await;

        // Assert
        assert_eq!(ack, ServerResponse::accepted());
        let ServerResponse::Orders { orders, .. } = orders else {
            panic!("expected orders reply");
        };
        assert_eq!(orders["5"], vec!["焼き鳥", "焼き鳥"]);
    }

    #[tokio::test]
    async fn test_invalid_order_gets_no_reply_and_connection_stays_open() {
        // Arrange
        let (service, registry) = setup();
        let (mut client, _handle) = start(&service, &registry, 40002);

        // Act: an order with no items, then an inquiry on the same connection.
        client
            .write_all(br#"{"type":"order","table":"5","items":[]}"#)
            .await
            .unwrap();
        // Give the handler time to consume the first message on its own.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let reply = request(&mut client, r#"{"type":"inquiry"}"#).await;

        // Assert: the only reply is the inquiry's, and the ledger is empty.
        assert_eq!(reply, ServerResponse::orders(Default::default()));
    }

    #[tokio::test]
    async fn test_unknown_type_gets_no_reply() {
        let (service, registry) = setup();
        let (mut client, _handle) = start(&service, &registry, 40003);

        client.write_all(br#"{"type":"hello"}"#).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let reply = request(&mut client, r#"{"type":"inquiry"}"#).await;

        assert!(matches!(reply, ServerResponse::Orders { .. }));
    }

    #[tokio::test]
    async fn test_malformed_message_closes_connection_without_reply() {
        // Arrange
        let (service, registry) = setup();
        let (mut client, handle) = start(&service, &registry, 40004);

        // Act
        client.write_all(b"not json at all").await.unwrap();
        tokio::time::timeout(READ_TIMEOUT, handle)
            .await
            .expect("handler must exit")
            .unwrap();

        // Assert: EOF with no bytes, and the registry entry is gone.
        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert!(lock_registry(&registry).is_empty());
    }

    #[tokio::test]
    async fn test_peer_hangup_ends_handler_and_deregisters() {
        // Arrange
        let (service, registry) = setup();
        let (client, handle) = start(&service, &registry, 40005);
        tokio::task::yield_now().await;

        // Act
        drop(client);
        tokio::time::timeout(READ_TIMEOUT, handle)
            .await
            .expect("handler must exit")
            .unwrap();

        // Assert
        assert!(lock_registry(&registry).is_empty());
    }

    #[tokio::test]
    async fn test_connection_is_registered_while_open() {
        let (service, registry) = setup();
        let (mut client, _handle) = start(&service, &registry, 40006);

        // A round trip guarantees the handler has started and registered.
        request(&mut client, r#"{"type":"inquiry"}"#).await;

        assert!(lock_registry(&registry).contains(peer(40006)));
    }

    #[tokio::test]
    async fn test_oversized_order_leaves_ledger_and_connection_intact() {
        // Arrange
        let (service, registry) = setup();
        let (mut client, _handle) = start(&service, &registry, 40007);
        request(&mut client, r#"{"type":"order","table":"1","items":[["ok",1]]}"#).await;

        // Act
        client
            .write_all(br#"{"type":"order","table":"1","items":[["ok",1],["boom",9223372036854775807]]}"#)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let reply = request(&mut client, r#"{"type":"inquiry"}"#).await;

        // Assert: no ack was sent, and only the earlier order is recorded.
        let ServerResponse::Orders { orders, .. } = reply else {
            panic!("expected orders reply");
        };
        assert_eq!(orders["1"], vec!["ok"]);
    }
}
