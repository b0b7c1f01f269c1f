//! Infrastructure layer for handy-server.
//!
//! Handles all I/O: the TCP order listener, the per-connection protocol loop,
//! the HTTP status endpoint, and reading the config file.
//!
//! # Responsibilities
//!
//! - Binding the order and status listeners (fatal at startup on failure)
//! - Spawning one Tokio task per accepted terminal connection
//! - Reading one message per `read()` and writing one reply per `write_all()`
//! - Serving `GET /order_status`
//! - Stopping both accept loops when the shutdown flag is cleared
//!
//! # What does NOT belong here?
//!
//! - Validation and ledger logic (application layer / `handy-core`)
//! - Message type definitions (`handy-core`)

use std::net::SocketAddr;

use thiserror::Error;

pub mod acceptor;
pub mod connection;
pub mod status;
pub mod storage;

pub use acceptor::OrderListener;
pub use connection::{handle_connection, ConnectionError};
pub use status::StatusServer;

/// Errors from the listeners.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A listening socket could not be bound.  Fatal at startup.
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The local address of a bound listener could not be read.
    #[error("could not read local address: {0}")]
    LocalAddr(#[source] std::io::Error),

    /// The HTTP status server stopped with an I/O error.
    #[error("status server failed: {0}")]
    Serve(#[source] std::io::Error),
}
