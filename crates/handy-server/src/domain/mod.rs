//! Domain layer for handy-server.
//!
//! Pure configuration types with no dependencies on I/O or the async runtime.
//! The infrastructure layer fills them in from the config file and the CLI.

pub mod config;

pub use config::ServerConfig;
