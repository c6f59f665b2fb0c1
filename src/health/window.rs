//! Sliding sample windows and the windowed digest.

use std::collections::VecDeque;

use serde::Serialize;

/// Samples retained per metric (5 minutes at one sample per second).
pub const WINDOW_CAPACITY: usize = 300;

/// One point-in-time measurement of the game connection.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSample {
    /// Whether an established game connection was found.
    pub status: bool,

    /// Round-trip latency in milliseconds; infinite when the echo failed.
    pub ping_latency_ms: f64,

    /// Whether this measurement counted as a lost packet.
    pub lost: bool,

    /// Cumulative loss count at the time of the sample.
    pub packet_loss_count: u64,

    /// Unix timestamp (seconds) of the sample.
    pub timestamp: f64,
}

/// Windowed average view pushed to the hub.
///
/// The asymmetry is deliberate: loss is a count of discrete events, status
/// and latency are continuous quality measures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthDigest {
    /// Fraction of up samples in the window, 0.0–1.0.
    pub status: f64,

    /// Mean latency over the window in milliseconds.
    pub ping_latency: f64,

    /// Count of lost measurements in the window (sum, not average).
    pub packet_loss_count: u64,

    /// Mean sample timestamp over the window.
    pub timestamp: f64,
}

impl HealthDigest {
    /// The all-zero digest reported before the first sample.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: 0.0,
            ping_latency: 0.0,
            packet_loss_count: 0,
            timestamp: 0.0,
        }
    }
}

/// Fixed-capacity FIFO windows, one per metric.
///
/// The oldest sample is evicted before a new one is appended once capacity
/// is reached; the windows never exceed capacity. Allocated once at sampler
/// construction and never reset.
#[derive(Debug)]
pub struct HealthWindows {
    status: VecDeque<bool>,
    ping_latency: VecDeque<f64>,
    lost: VecDeque<bool>,
    timestamp: VecDeque<f64>,
    capacity: usize,
}

impl HealthWindows {
    /// Create windows with the standard capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    /// Create windows with a custom capacity (tests use small ones).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            status: VecDeque::with_capacity(capacity),
            ping_latency: VecDeque::with_capacity(capacity),
            lost: VecDeque::with_capacity(capacity),
            timestamp: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest entries first when full.
    pub fn push(&mut self, sample: &HealthSample) {
        if self.status.len() >= self.capacity {
            self.status.pop_front();
        }
        if self.ping_latency.len() >= self.capacity {
            self.ping_latency.pop_front();
        }
        if self.lost.len() >= self.capacity {
            self.lost.pop_front();
        }
        if self.timestamp.len() >= self.capacity {
            self.timestamp.pop_front();
        }

        self.status.push_back(sample.status);
        self.ping_latency.push_back(sample.ping_latency_ms);
        self.lost.push_back(sample.lost);
        self.timestamp.push_back(sample.timestamp);
    }

    /// Number of samples currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    /// Whether no sample has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }

    /// The windowed average view; all zeros before the first sample.
    #[must_use]
    pub fn digest(&self) -> HealthDigest {
        if self.is_empty() {
            return HealthDigest::empty();
        }

        let up = self.status.iter().filter(|&&s| s).count();
        let status = up as f64 / self.status.len() as f64;

        let ping_latency =
            self.ping_latency.iter().sum::<f64>() / self.ping_latency.len() as f64;

        let packet_loss_count = self.lost.iter().filter(|&&l| l).count() as u64;

        let timestamp = self.timestamp.iter().sum::<f64>() / self.timestamp.len() as f64;

        HealthDigest {
            status,
            ping_latency,
            packet_loss_count,
            timestamp,
        }
    }
}

impl Default for HealthWindows {
    fn default() -> Self {
        Self::new()
    }
}
