//! Gateway configuration types.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// How many backends are tried for one inbound connection before giving up.
pub const CONNECT_ATTEMPTS: u32 = 25;

/// Per-attempt backend connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for one gateway instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address for the local listener.
    pub bind_address: IpAddr,

    /// Local port the game client connects to (0 picks an ephemeral port).
    pub port: u16,

    /// Backend attempts per inbound connection.
    pub connect_attempts: u32,

    /// Per-attempt connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 13304,
            connect_attempts: CONNECT_ATTEMPTS,
            connect_timeout_secs: CONNECT_TIMEOUT.as_secs(),
        }
    }
}

impl GatewayConfig {
    /// Create a config listening on the given local port.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Set the bind address.
    #[must_use]
    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// The socket address to bind.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Per-attempt connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = GatewayConfig::default();
        assert_eq!(config.connect_attempts, CONNECT_ATTEMPTS);
        assert_eq!(config.connect_timeout(), CONNECT_TIMEOUT);
    }

    #[test]
    fn test_bind_addr() {
        let config = GatewayConfig::new(0);
        assert_eq!(config.bind_addr().port(), 0);
        assert!(config.bind_addr().ip().is_loopback());
    }
}
