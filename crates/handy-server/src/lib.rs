//! handy-server library crate.
//!
//! The central order-intake process.  Handheld terminals connect over TCP and
//! send JSON orders and inquiries; a separate HTTP endpoint serves the live
//! ledger to the front-desk display.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Handy terminals (JSON over TCP)          Front desk (HTTP GET)
//!         ↕                                        ↓
//! [handy-server]
//!   ├── domain/           ServerConfig (bind addresses)
//!   ├── application/      OrderService dispatch, ConnectionRegistry
//!   └── infrastructure/
//!         ├── acceptor/   TCP accept loop, one task per connection
//!         ├── connection/ per-connection read → dispatch → write loop
//!         ├── status/     GET /order_status (axum)
//!         └── storage/    TOML config file
//!         ↕
//! [handy-core]  OrderLedger + JSON codec
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `handy-core`; it never touches a
//!   socket, so dispatch can be tested without a network.
//! - `infrastructure` owns every listener, stream, and file.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: message dispatch and connection bookkeeping.
pub mod application;

/// Infrastructure layer: TCP acceptor, HTTP status endpoint, config file.
pub mod infrastructure;
