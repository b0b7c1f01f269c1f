//! ConnectionRegistry: the set of handy terminals connected right now.
//!
//! Each accepted TCP connection is registered under its peer address when the
//! handler starts and removed when the handler exits, however it exits: peer
//! hang-up, decode error, or I/O error.  Removal is tied to a
//! [`ConnectionGuard`] being dropped, so an early `return` or `?` in the
//! connection loop cannot leave a stale entry behind.
//!
//! The registry is pure bookkeeping.  It does not own the sockets and has no
//! influence on admission: the acceptor never refuses a connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// A terminal with an open connection.
#[derive(Debug, Clone)]
pub struct ConnectedPeer {
    pub addr: SocketAddr,
    pub connected_at: Instant,
}

/// In-memory registry of open connections, keyed by peer address.
///
/// A TCP peer address is unique among live connections, so it doubles as the
/// connection id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    peers: HashMap<SocketAddr, ConnectedPeer>,
}

/// The registry as shared between the acceptor and every connection task.
///
/// A `std::sync::Mutex` rather than Tokio's: the critical sections never await,
/// and [`ConnectionGuard`] has to lock it from `Drop`.
pub type SharedRegistry = Arc<Mutex<ConnectionRegistry>>;

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry ready to be shared across tasks.
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Records a newly opened connection.
    pub fn register(&mut self, addr: SocketAddr) {
        self.peers.insert(
            addr,
            ConnectedPeer {
                addr,
                connected_at: Instant::now(),
            },
        );
    }

    /// Forgets a connection.  Returns the entry if it was present.
    pub fn remove(&mut self, addr: SocketAddr) -> Option<ConnectedPeer> {
        self.peers.remove(&addr)
    }

    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.peers.contains_key(&addr)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Returns a snapshot of all open connections.
    pub fn peers(&self) -> Vec<ConnectedPeer> {
        self.peers.values().cloned().collect()
    }
}

/// Locks the shared registry.
///
/// A panic in one connection task must not wedge bookkeeping for all the
/// others, so a poisoned lock is recovered rather than propagated.
pub fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, ConnectionRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps a connection registered for as long as it is alive.
///
/// Created at the top of the connection handler; dropping it removes the
/// entry.
#[derive(Debug)]
pub struct ConnectionGuard {
    registry: SharedRegistry,
    addr: SocketAddr,
}

impl ConnectionGuard {
    /// Registers `addr` and returns the guard together with the number of open
    /// connections including this one.
    pub fn register(registry: &SharedRegistry, addr: SocketAddr) -> (Self, usize) {
        let open = {
            let mut reg = lock_registry(registry);
            reg.register(addr);
            reg.len()
        };
        let guard = Self {
            registry: Arc::clone(registry),
            addr,
        };
        (guard, open)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        lock_registry(&self.registry).remove(self.addr);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
