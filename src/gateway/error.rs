//! Gateway error types.

use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur in the gateway relay.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {address}: {source}")]
    BindError {
        /// The address that failed to bind.
        address: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The backend address pool is empty.
    #[error("backend address pool is empty")]
    EmptyPool,

    /// All backend connection attempts were exhausted for one inbound connection.
    #[error("no backend reachable after {attempts} attempts")]
    BackendsExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
