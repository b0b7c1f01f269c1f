//! Application layer use cases for the order server.
//!
//! Nothing here opens a socket.  The infrastructure layer decodes bytes,
//! hands the resulting message to these use cases, and writes back whatever
//! they return.
//!
//! # Sub-modules
//!
//! - **`order_service`** – Validates orders, applies them to the ledger,
//!   answers inquiries, and publishes an event per accepted order.
//!
//! - **`connection_registry`** – Tracks which terminals are connected right
//!   now.  Entries are removed on every connection exit path.

pub mod connection_registry;
pub mod order_service;

pub use connection_registry::{ConnectionGuard, ConnectionRegistry, SharedRegistry};
pub use order_service::{Dispatch, OrderEvent, OrderService};
