//! Order listener: TCP accept loop and per-connection task spawning.
//!
//! [`OrderListener::run`] accepts terminal connections forever (until the
//! shutdown flag is cleared).  Each accepted connection gets its own Tokio
//! task running [`handle_connection`]; the loop goes straight back to
//! `accept()` without waiting for it.
//!
//! There is no connection limit and no admission control.  A terminal that
//! connects and then goes quiet keeps its task parked on `read()` until it
//! sends data or hangs up.
//!
//! # Failure policy
//!
//! - Failure to bind is fatal and surfaces from [`OrderListener::bind`].
//! - A failed `accept()` (e.g. out of file descriptors) is logged and the loop
//!   continues after a short backoff, so a persistent error does not spin.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{error, info};

use crate::application::{OrderService, SharedRegistry};
use crate::infrastructure::connection::handle_connection;
use crate::infrastructure::ServerError;

/// How long one `accept()` may block before the loop re-checks the shutdown
/// flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Pause after a failed `accept()` before trying again.  Errors such as
/// running out of file descriptors persist until a connection closes.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A bound TCP listener for the handy order protocol.
#[derive(Debug)]
pub struct OrderListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl OrderListener {
    /// Binds the order listener.
    ///
    /// Pass port 0 to let the OS pick a free port; [`local_addr`](Self::local_addr)
    /// reports the one chosen.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::BindFailed`] if the address is in use or the
    /// process lacks permission to bind it.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::BindFailed { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop until `running` is set to `false`.
    ///
    /// Connection tasks already spawned are not cancelled when the loop exits;
    /// they end with their peer or with the runtime.
    pub async fn run(
        self,
        service: Arc<OrderService>,
        registry: SharedRegistry,
        running: Arc<AtomicBool>,
    ) {
        info!("order listener accepting on {}", self.local_addr);

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping order accept loop");
                break;
            }

            match timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, peer_addr))) => {
                    let service = Arc::clone(&service);
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        handle_connection(stream, peer_addr, service, registry).await;
                    });
                }
                Ok(Err(e)) => {
                    error!("accept error: {e}; retrying in {ACCEPT_ERROR_BACKOFF:?}");
                    back_off_after_accept_error().await;
                }
                Err(_) => {
                    // No new connection within the poll interval.
                }
            }
        }
    }
}

async fn back_off_after_accept_error() {
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_port_zero_reports_assigned_port() {
        let listener = OrderListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .expect("bind");
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_to_taken_port_returns_bind_failed() {
        // Arrange: hold a port open.
        let first = OrderListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .expect("bind");

        // Act
        let second = OrderListener::bind(first.local_addr()).await;

        // Assert
        assert!(matches!(second, Err(ServerError::BindFailed { .. })));
    }

    #[tokio::test]
    async fn test_run_returns_when_flag_already_cleared() {
        let listener = OrderListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let service = Arc::new(OrderService::new(Default::default()));
        let registry = crate::application::ConnectionRegistry::shared();
        let running = Arc::new(AtomicBool::new(false));

        // Must return promptly instead of blocking on accept().
        tokio::time::timeout(
            Duration::from_secs(2),
            listener.run(service, registry, running),
        )
        .await
        .expect("accept loop must stop");
    }

    #[tokio::test]
    async fn test_accept_error_backoff_waits_before_retry() {
        let started = std::time::Instant::now();

        back_off_after_accept_error().await;

        assert!(started.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }
}
