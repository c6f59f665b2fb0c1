//! Round-trip latency measurement.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Echo timeout; expiry counts as a failed measurement.
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Fallback estimate when a server's address list cannot be measured.
pub const DEFAULT_PING_MS: f64 = 50.0;

/// Trait for round-trip measurement facilities.
///
/// Production code uses [`TcpPinger`]; tests substitute a canned
/// implementation.
pub trait Pinger: Send + Sync {
    /// Measure round-trip time to `host:port` in milliseconds.
    ///
    /// Returns `None` on timeout or failure.
    fn ping<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = Option<f64>> + Send + 'a>>;
}

/// Measures latency by timing a TCP connect.
///
/// A network-layer echo without raw-socket privileges: the SYN/SYN-ACK
/// exchange bounds one round trip to the peer.
#[derive(Debug, Clone)]
pub struct TcpPinger {
    /// Per-measurement timeout.
    timeout: Duration,
}

impl TcpPinger {
    /// Create a pinger with the standard timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: PING_TIMEOUT,
        }
    }

    /// Override the measurement timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for TcpPinger {
    fn default() -> Self {
        Self::new()
    }
}

impl Pinger for TcpPinger {
    fn ping<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = Option<f64>> + Send + 'a>> {
        Box::pin(async move {
            let start = Instant::now();

            match timeout(self.timeout, TcpStream::connect((host, port))).await {
                Ok(Ok(_stream)) => {
                    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                    Some(elapsed_ms)
                },
                Ok(Err(e)) => {
                    debug!(host, port, error = %e, "Ping connect failed");
                    None
                },
                Err(_) => {
                    debug!(host, port, "Ping timed out");
                    None
                },
            }
        })
    }
}

/// Average round trip across a server's address list, rounded to 2 decimals.
///
/// Every host must answer for a measurement to count; any failure yields
/// `None` and callers fall back to [`DEFAULT_PING_MS`].
pub async fn average_round_trip(pinger: &dyn Pinger, hosts: &[String], port: u16) -> Option<f64> {
    if hosts.is_empty() {
        return None;
    }

    let mut total = 0.0;
    for host in hosts {
        total += pinger.ping(host, port).await?;
    }

    let avg = total / hosts.len() as f64;
    Some((avg * 100.0).round() / 100.0)
}
