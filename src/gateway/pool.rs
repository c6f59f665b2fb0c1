//! Round-robin backend address pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A backend endpoint the gateway can relay to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAddr {
    /// Host name or IP address.
    pub host: String,

    /// Backend port.
    pub port: u16,
}

impl BackendAddr {
    /// Create a new backend address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for BackendAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Round-robin iterator over a fixed list of backend addresses.
///
/// The cursor advances circularly and wraps indefinitely; selection order is
/// exactly the seed order, with no randomness. The atomic cursor makes the
/// pool safe to share across concurrent accept handlers, each caller seeing
/// a distinct next entry.
#[derive(Debug)]
pub struct AddressPool {
    /// Backend entries in seed order.
    entries: Vec<BackendAddr>,

    /// Current cursor position.
    cursor: AtomicUsize,
}

impl AddressPool {
    /// Create a pool from a list of hosts sharing one backend port.
    ///
    /// Returns `None` for an empty host list; the gateway refuses to start
    /// without at least one backend.
    #[must_use]
    pub fn from_hosts(hosts: Vec<String>, port: u16) -> Option<Self> {
        if hosts.is_empty() {
            return None;
        }

        let entries = hosts
            .into_iter()
            .map(|host| BackendAddr::new(host, port))
            .collect();

        Some(Self {
            entries,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Create a pool from pre-built backend addresses.
    #[must_use]
    pub fn from_entries(entries: Vec<BackendAddr>) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }

        Some(Self {
            entries,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Advance the cursor and return the next backend address.
    ///
    /// Never fails: the cursor wraps around the pool indefinitely.
    #[must_use]
    pub fn next(&self) -> BackendAddr {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.entries.len();
        self.entries[idx].clone()
    }

    /// Number of entries in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty. Always false for a constructed pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared handle to an address pool.
pub type SharedPool = Arc<AddressPool>;
