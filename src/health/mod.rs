//! # Health Sampling
//!
//! Continuous characterization of the active game connection: find the
//! monitored process's established TCP connection in the OS socket table,
//! time an echo to its remote peer, and keep rolling statistics in
//! fixed-capacity windows for upstream reporting.

mod probe;
mod sampler;
mod window;

pub use probe::{ConnectionProbe, GameConnection, SystemProbe};
pub use sampler::HealthSampler;
pub use window::{HealthDigest, HealthSample, HealthWindows, WINDOW_CAPACITY};
