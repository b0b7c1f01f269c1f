//! Handy order server: entry point.
//!
//! Restaurant staff carry handheld "handy" terminals that send orders to this
//! process over TCP.  The process keeps every table's ordered items in memory
//! and serves the whole ledger as JSON to the front-desk display over HTTP.
//!
//! # Usage
//!
//! ```text
//! handy-server [OPTIONS]
//!
//! Options:
//!   --config      <PATH>   TOML config file (optional)
//!   --bind        <IP>     Address both listeners bind to [default: 0.0.0.0]
//!   --order-port  <PORT>   Terminal protocol port [default: 65432]
//!   --status-port <PORT>   HTTP status port [default: 5000]
//!   --log-level   <LEVEL>  Log filter when RUST_LOG is unset [default: info]
//! ```
//!
//! # Configuration precedence
//!
//! Built-in defaults, then the config file, then flags / environment
//! variables.  A flag beats its environment variable.
//!
//! | Variable            | Flag            |
//! |---------------------|-----------------|
//! | `HANDY_CONFIG`      | `--config`      |
//! | `HANDY_BIND`        | `--bind`        |
//! | `HANDY_ORDER_PORT`  | `--order-port`  |
//! | `HANDY_STATUS_PORT` | `--status-port` |
//! | `HANDY_LOG`         | `--log-level`   |
//!
//! `RUST_LOG`, when set, overrides the configured log level entirely.
//!
//! # Architecture overview
//!
//! ```text
//! Handy terminals (JSON over TCP, port 65432)
//!       ↕
//! handy-server  ← this process
//!   OrderListener ── one task per terminal ──► OrderService ──► OrderLedger
//!   StatusServer  ── GET /order_status ─────────────────────────► snapshot
//!       ↓
//! Front desk (HTTP, port 5000)
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use handy_core::OrderLedger;
use handy_server::application::{ConnectionRegistry, OrderEvent, OrderService};
use handy_server::infrastructure::storage::config::{load_config, FileConfig};
use handy_server::infrastructure::{OrderListener, StatusServer};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Order-intake server for handheld restaurant order terminals.
///
/// Every flag is optional.  An unset flag leaves the config-file value (or the
/// built-in default) in place.
#[derive(Debug, Parser)]
#[command(
    name = "handy-server",
    about = "Order-intake server for handheld restaurant order terminals",
    version
)]
struct Cli {
    /// Path to a TOML config file.  A missing file means "use defaults".
    #[arg(long, env = "HANDY_CONFIG")]
    config: Option<PathBuf>,

    /// IP address both listeners bind to.
    ///
    /// Use `0.0.0.0` to accept terminals from the restaurant LAN, or
    /// `127.0.0.1` for local testing.
    #[arg(long, env = "HANDY_BIND")]
    bind: Option<String>,

    /// TCP port terminals connect to.
    #[arg(long, env = "HANDY_ORDER_PORT")]
    order_port: Option<u16>,

    /// HTTP port serving `GET /order_status`.
    #[arg(long, env = "HANDY_STATUS_PORT")]
    status_port: Option<u16>,

    /// Log filter used when `RUST_LOG` is unset (e.g. `debug`).
    #[arg(long, env = "HANDY_LOG")]
    log_level: Option<String>,
}

impl Cli {
    /// Reads the config file (if any) and overlays the flags on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    fn resolve(&self) -> anyhow::Result<FileConfig> {
        let base = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
            None => FileConfig::default(),
        };
        Ok(self.overlay(base))
    }

    /// Applies every flag that was given to `file`.
    fn overlay(&self, mut file: FileConfig) -> FileConfig {
        if let Some(bind) = &self.bind {
            file.network.bind_address = bind.clone();
        }
        if let Some(port) = self.order_port {
            file.network.order_port = port;
        }
        if let Some(port) = self.status_port {
            file.network.status_port = port;
        }
        if let Some(level) = &self.log_level {
            file.logging.log_level = level.clone();
        }
        file
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. Flags and the optional config file are resolved into a [`FileConfig`].
/// 2. `tracing_subscriber` is initialised from `RUST_LOG`, falling back to the
///    configured log level.
/// 3. Both listeners are bound.  Either failing aborts startup with a non-zero
///    exit status.
/// 4. The status endpoint, the order-event logger, and the Ctrl+C handler are
///    spawned as background tasks.
/// 5. The order accept loop runs on the main task until Ctrl+C clears the
///    shutdown flag.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file_config = cli.resolve()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&file_config.logging.log_level)),
        )
        .init();

    let config = file_config
        .server_config()
        .context("resolving listen addresses")?;

    info!(
        "handy order server starting: orders={}, status={}",
        config.order_bind_addr, config.status_bind_addr
    );

    // ── Bind listeners ────────────────────────────────────────────────────────
    let order_listener = OrderListener::bind(config.order_bind_addr)
        .await
        .context("binding order listener")?;
    let status_server = StatusServer::bind(config.status_bind_addr)
        .await
        .context("binding status endpoint")?;

    // ── Shared state ──────────────────────────────────────────────────────────
    let ledger = Arc::new(OrderLedger::new());
    let service = Arc::new(OrderService::new(Arc::clone(&ledger)));
    let registry = ConnectionRegistry::shared();
    let running = Arc::new(AtomicBool::new(true));

    // Front-desk notifications go to the log until a display subscribes.
    let mut events = service.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(OrderEvent::OrderAccepted {
                    table_id, entries, ..
                }) => {
                    info!("new order for table {table_id}: {entries} item(s)");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("order notifications lagged; {skipped} skipped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let status_task = tokio::spawn(status_server.serve(ledger, Arc::clone(&running)));

    // ── Main accept loop ──────────────────────────────────────────────────────
    order_listener.run(service, registry, running).await;

    status_task
        .await
        .context("status endpoint task panicked")?
        .context("status endpoint failed")?;

    info!("handy order server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
