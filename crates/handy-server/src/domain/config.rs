//! Server configuration types.
//!
//! [`ServerConfig`] holds the two listening endpoints.  It is built once at
//! startup from defaults, the optional TOML file, and CLI flags, in that order
//! of precedence (later wins).

use std::net::SocketAddr;

/// Default TCP endpoint for the handy order protocol.
pub const DEFAULT_ORDER_PORT: u16 = 65432;

/// Default HTTP endpoint for `GET /order_status`.
pub const DEFAULT_STATUS_PORT: u16 = 5000;

/// All runtime configuration for the order server.
///
/// # Example
///
/// ```rust
/// use handy_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.order_bind_addr.port(), 65432);
/// assert_eq!(cfg.status_bind_addr.port(), 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Where handy terminals connect to send orders and inquiries.
    pub order_bind_addr: SocketAddr,

    /// Where the front-desk display polls `GET /order_status`.
    pub status_bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    /// Both endpoints listen on every interface: terminals and the display
    /// live on the restaurant LAN, not on the server machine.
    ///
    /// | Field            | Default          |
    /// |------------------|------------------|
    /// | order_bind_addr  | `0.0.0.0:65432`  |
    /// | status_bind_addr | `0.0.0.0:5000`   |
    fn default() -> Self {
        Self {
            order_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_ORDER_PORT)),
            status_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_STATUS_PORT)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order_port_is_65432() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.order_bind_addr.port(), 65432);
    }

    #[test]
    fn test_default_status_port_is_5000() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.status_bind_addr.port(), 5000);
    }

    #[test]
    fn test_default_binds_all_interfaces() {
        let cfg = ServerConfig::default();
        assert!(cfg.order_bind_addr.ip().is_unspecified());
        assert!(cfg.status_bind_addr.ip().is_unspecified());
    }
}
