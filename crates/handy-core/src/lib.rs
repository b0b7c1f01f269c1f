//! # handy-core
//!
//! Shared library for the handy order service containing the order ledger and
//! the JSON wire protocol spoken by the handheld order terminals.
//!
//! This crate has no dependencies on network sockets.  The server crate owns
//! all transport concerns and calls into this crate to decode requests, mutate
//! or read the ledger, and encode responses.
//!
//! # Architecture overview
//!
//! Many handheld terminals ("handies") sit on the restaurant floor.  Staff pick
//! menu items on a handy, which sends a small JSON message to the central order
//! server.  The server keeps one live ledger of everything each table has
//! ordered.
//!
//! - **`ledger`** – The single source of truth: table id → ordered list of item
//!   names.  All reads and writes go through one lock so every reader sees a
//!   consistent point-in-time view.
//!
//! - **`protocol`** – How bytes travel over the wire.  One read from the socket
//!   carries one complete JSON object; there is no length prefix or delimiter.

pub mod ledger;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `handy_core::OrderLedger` instead of `handy_core::ledger::OrderLedger`.
pub use ledger::{LedgerError, LedgerSnapshot, OrderLedger};
pub use protocol::codec::{decode_message, encode_response, ProtocolError, MAX_MESSAGE_SIZE};
pub use protocol::messages::{
    ClientMessage, OrderLine, OrderMessage, ServerResponse, ValidatedOrder, ValidationError,
    MAX_ENTRIES_PER_ORDER,
};
