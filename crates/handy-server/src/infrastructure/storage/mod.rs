//! Storage infrastructure: the optional configuration file.
//!
//! The order ledger itself is never persisted.  The only thing read from disk
//! is the server's own configuration.

pub mod config;
