//! HTTP status endpoint for the front-desk display.
//!
//! `GET /order_status` returns the current ledger as a JSON object:
//!
//! ```json
//! {"5":["焼き鳥","焼き鳥"],"7":["ビール"]}
//! ```
//!
//! This is a read-only path, independent of the terminal protocol.  It runs on
//! its own port and its own task, and reads the ledger through the same
//! `snapshot()` the inquiry message uses.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use tokio::net::TcpListener;
use tracing::info;

use handy_core::{LedgerSnapshot, OrderLedger};

use crate::infrastructure::ServerError;

/// How often graceful shutdown re-checks the running flag.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Builds the status router.
///
/// Exposed separately from [`StatusServer`] so the routes can be mounted into
/// a larger application.
pub fn router(ledger: Arc<OrderLedger>) -> Router {
    Router::new()
        .route("/order_status", get(order_status))
        .with_state(ledger)
}

async fn order_status(State(ledger): State<Arc<OrderLedger>>) -> Json<LedgerSnapshot> {
    Json(ledger.snapshot().await)
}

/// A bound HTTP listener serving [`router`].
#[derive(Debug)]
pub struct StatusServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl StatusServer {
    /// Binds the status listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::BindFailed`] if the port is unavailable.
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

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves requests until `running` is set to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Serve`] if the HTTP server fails.
    pub async fn serve(
        self,
        ledger: Arc<OrderLedger>,
        running: Arc<AtomicBool>,
    ) -> Result<(), ServerError> {
        info!("status endpoint serving http://{}/order_status", self.local_addr);

        axum::serve(self.listener, router(ledger))
            .with_graceful_shutdown(wait_for_shutdown(running))
            .await
            .map_err(ServerError::Serve)
    }
}

async fn wait_for_shutdown(running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
    }
    info!("shutdown flag set; stopping status endpoint");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
