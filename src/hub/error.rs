//! Hub client error types.

use thiserror::Error;

/// Errors that can occur on the hub control connection.
#[derive(Debug, Error)]
pub enum HubError {
    /// Failed to reach the hub.
    #[error("failed to connect to hub {address}: {source}")]
    ConnectFailed {
        /// The hub address.
        address: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The hub accepted the connection but sent no identifier.
    #[error("handshake failed: no identifier received")]
    HandshakeFailed,

    /// Reconnection attempts were exhausted.
    #[error("hub unreachable after {attempts} reconnect attempts")]
    ReconnectExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// No connection and reconnection was not possible.
    #[error("not connected to hub")]
    NotConnected,

    /// Failed to serialize an outbound message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to write a frame.
    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// The outbound buffer did not drain in time.
    #[error("write drain timed out")]
    DrainTimeout,
}

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;
