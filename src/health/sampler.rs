//! The health sampler: probe, measure, digest.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::config::{GatewaySection, HealthSection, HubSection};
use crate::net::{Pinger, TcpPinger};

use super::probe::{ConnectionProbe, GameConnection, SystemProbe};
use super::window::{HealthDigest, HealthSample, HealthWindows};

/// Characterizes the quality of the *game* connection (not the hub control
/// connection) for upstream reporting.
///
/// No background loop of its own: the hub client's periodic health-report
/// task calls [`HealthSampler::digest`] on demand.
pub struct HealthSampler {
    probe: Box<dyn ConnectionProbe>,
    pinger: Box<dyn Pinger>,
    windows: HealthWindows,

    /// Last probed connection.
    connection: Option<GameConnection>,

    /// Whether the last probe found a connection.
    status: bool,

    /// Cumulative loss counter, monotonic for the life of the sampler.
    packet_loss_total: u64,
}

impl HealthSampler {
    /// Build the production sampler from configuration.
    ///
    /// The gateway and hub ports are excluded from the connection search so
    /// the relay's own sockets and the control connection never count as the
    /// game connection.
    #[must_use]
    pub fn from_config(
        health: &HealthSection,
        gateway: &GatewaySection,
        hub: &HubSection,
    ) -> Self {
        let probe = SystemProbe::new(
            health.process_name.clone(),
            vec![gateway.local_port, hub.port],
        );
        Self::with_parts(Box::new(probe), Box::new(TcpPinger::new()))
    }

    /// Build a sampler from explicit parts (the test seam).
    #[must_use]
    pub fn with_parts(probe: Box<dyn ConnectionProbe>, pinger: Box<dyn Pinger>) -> Self {
        Self {
            probe,
            pinger,
            windows: HealthWindows::new(),
            connection: None,
            status: false,
            packet_loss_total: 0,
        }
    }

    /// Probe the OS for the game's active connection.
    pub fn sample(&mut self) {
        self.connection = self.probe.active_connection();
        self.status = self.connection.is_some();
        debug!(status = self.status, connection = ?self.connection, "Sampled game connection");
    }

    /// Measure latency to the probed remote peer.
    ///
    /// A failed echo against a known peer yields infinite latency and counts
    /// as packet loss; having no peer at all yields infinite latency without
    /// counting as loss.
    pub async fn measure(&mut self) -> HealthSample {
        let (ping_latency_ms, lost) = match self.connection {
            Some(conn) => {
                let host = conn.remote.ip().to_string();
                match self.pinger.ping(&host, conn.remote.port()).await {
                    Some(latency) => (latency, false),
                    None => {
                        self.packet_loss_total += 1;
                        (f64::INFINITY, true)
                    },
                }
            },
            None => {
                debug!("No remote peer to measure");
                (f64::INFINITY, false)
            },
        };

        HealthSample {
            status: self.status,
            ping_latency_ms,
            lost,
            packet_loss_count: self.packet_loss_total,
            timestamp: unix_now(),
        }
    }

    /// Take a fresh sample, fold it into the windows, and return the
    /// windowed average view.
    pub async fn digest(&mut self) -> HealthDigest {
        self.sample();
        let sample = self.measure().await;
        self.windows.push(&sample);
        self.windows.digest()
    }

    /// Cumulative loss counter since construction.
    #[must_use]
    pub fn packet_loss_total(&self) -> u64 {
        self.packet_loss_total
    }

    /// The most recently probed connection.
    #[must_use]
    pub fn connection(&self) -> Option<GameConnection> {
        self.connection
    }
}

/// Current Unix time in fractional seconds.
fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Pinger;
    use std::future::Future;
    use std::net::SocketAddr;
    use std::pin::Pin;

    struct FixedProbe(Option<GameConnection>);

    impl ConnectionProbe for FixedProbe {
        fn active_connection(&mut self) -> Option<GameConnection> {
            self.0
        }
    }

    struct FixedPinger(Option<f64>);

    impl Pinger for FixedPinger {
        fn ping<'a>(
            &'a self,
            _host: &'a str,
            _port: u16,
        ) -> Pin<Box<dyn Future<Output = Option<f64>> + Send + 'a>> {
            let value = self.0;
            Box::pin(async move { value })
        }
    }

    fn game_connection() -> GameConnection {
        GameConnection {
            local: "192.168.1.5:52000".parse::<SocketAddr>().unwrap(),
            remote: "203.0.113.9:15779".parse::<SocketAddr>().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_digest_with_healthy_connection() {
        let mut sampler = HealthSampler::with_parts(
            Box::new(FixedProbe(Some(game_connection()))),
            Box::new(FixedPinger(Some(42.0))),
        );

        let digest = sampler.digest().await;
        assert!((digest.status - 1.0).abs() < f64::EPSILON);
        assert!((digest.ping_latency - 42.0).abs() < f64::EPSILON);
        assert_eq!(digest.packet_loss_count, 0);
        assert!(digest.timestamp > 0.0);
    }

    #[tokio::test]
    async fn test_no_connection_reports_down() {
        let mut sampler = HealthSampler::with_parts(
            Box::new(FixedProbe(None)),
            Box::new(FixedPinger(Some(42.0))),
        );

        let digest = sampler.digest().await;
        assert!(digest.status.abs() < f64::EPSILON);
        assert!(digest.ping_latency.is_infinite());
        // No peer means no measurement, so no loss either
        assert_eq!(digest.packet_loss_count, 0);
    }

    #[tokio::test]
    async fn test_failed_echo_counts_as_loss() {
        let mut sampler = HealthSampler::with_parts(
            Box::new(FixedProbe(Some(game_connection()))),
            Box::new(FixedPinger(None)),
        );

        let _ = sampler.digest().await;
        let digest = sampler.digest().await;

        assert_eq!(digest.packet_loss_count, 2);
        assert_eq!(sampler.packet_loss_total(), 2);
        assert!(digest.ping_latency.is_infinite());
        // The connection exists even though the echo fails
        assert!((digest.status - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_loss_digest_counts_window_failures_only() {
        let mut sampler = HealthSampler::with_parts(
            Box::new(FixedProbe(Some(game_connection()))),
            Box::new(FixedPinger(Some(10.0))),
        );

        // Three clean samples, then swap in a failing pinger.
        for _ in 0..3 {
            let _ = sampler.digest().await;
        }
        sampler.pinger = Box::new(FixedPinger(None));
        for _ in 0..2 {
            let _ = sampler.digest().await;
        }

        let digest = sampler.digest().await;
        assert_eq!(digest.packet_loss_count, 3);
        assert_eq!(sampler.packet_loss_total(), 3);
    }

    #[tokio::test]
    async fn test_status_fraction_mixes_up_and_down() {
        let mut sampler = HealthSampler::with_parts(
            Box::new(FixedProbe(Some(game_connection()))),
            Box::new(FixedPinger(Some(10.0))),
        );

        let _ = sampler.digest().await;
        sampler.probe = Box::new(FixedProbe(None));
        let digest = sampler.digest().await;

        assert!((digest.status - 0.5).abs() < f64::EPSILON);
    }
}
