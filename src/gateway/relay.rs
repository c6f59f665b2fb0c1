//! Bidirectional relay between an inbound connection and a backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Copy buffer size. Any size preserving byte order is correct; this matches
/// typical socket buffer granularity.
const RELAY_BUFFER_SIZE: usize = 8192;

/// Byte counters for one relay session.
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Bytes copied inbound → backend.
    pub bytes_to_backend: AtomicU64,

    /// Bytes copied backend → inbound.
    pub bytes_to_client: AtomicU64,
}

impl RelayStats {
    /// Total bytes relayed in both directions.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.bytes_to_backend.load(Ordering::Relaxed) + self.bytes_to_client.load(Ordering::Relaxed)
    }
}

/// One bidirectional byte-copy pairing between an inbound socket and a
/// backend socket.
///
/// Both directions run concurrently; either direction ending (EOF or error)
/// terminates the session, and both streams are dropped on return so neither
/// half outlives the other.
pub struct RelaySession {
    inbound: TcpStream,
    outbound: TcpStream,
    stats: Arc<RelayStats>,
}

impl RelaySession {
    /// Pair an inbound connection with an established backend connection.
    #[must_use]
    pub fn new(inbound: TcpStream, outbound: TcpStream) -> Self {
        Self {
            inbound,
            outbound,
            stats: Arc::new(RelayStats::default()),
        }
    }

    /// Shared handle to this session's byte counters.
    #[must_use]
    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Run the relay until either side closes or errors.
    ///
    /// Returns the byte totals for the session. A peer disconnect is an
    /// expected outcome, not an error; only the totals distinguish a clean
    /// close from a drop mid-stream.
    pub async fn run(self) -> (u64, u64) {
        let Self {
            mut inbound,
            mut outbound,
            stats,
        } = self;

        let (mut client_read, mut client_write) = inbound.split();
        let (mut backend_read, mut backend_write) = outbound.split();

        let client_to_backend = async {
            let mut buf = [0u8; RELAY_BUFFER_SIZE];
            let mut total = 0u64;
            loop {
                let n = match client_read.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                if backend_write.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                total += n as u64;
                stats.bytes_to_backend.store(total, Ordering::Relaxed);
            }
            total
        };

        let backend_to_client = async {
            let mut buf = [0u8; RELAY_BUFFER_SIZE];
            let mut total = 0u64;
            loop {
                let n = match backend_read.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                if client_write.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                total += n as u64;
                stats.bytes_to_client.store(total, Ordering::Relaxed);
            }
            total
        };

        // select! rather than join!: the first direction to finish ends the
        // session, so a half-open peer cannot hold the other half alive.
        let (sent, received) = tokio::select! {
            sent = client_to_backend => (sent, stats.bytes_to_client.load(Ordering::Relaxed)),
            received = backend_to_client => (stats.bytes_to_backend.load(Ordering::Relaxed), received),
        };

        debug!(sent, received, "Relay session finished");
        (sent, received)
    }
}
