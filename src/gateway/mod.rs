//! # Gateway Relay
//!
//! A local TCP gateway that forwards a game client's traffic to a backend
//! game-server chosen round-robin from a configured pool.
//!
//! ## Behavior
//!
//! - Binding is fatal when it fails; the caller decides what to do.
//! - Each accepted connection gets its own backend failover walk (up to
//!   [`CONNECT_ATTEMPTS`] attempts, [`CONNECT_TIMEOUT`] per attempt) and its
//!   own relay session.
//! - The relay is a transparent byte pipe: no framing, no inspection, no
//!   backpressure beyond OS socket buffering.

mod config;
mod error;
mod pool;
mod relay;
mod server;

pub use config::{GatewayConfig, CONNECT_ATTEMPTS, CONNECT_TIMEOUT};
pub use error::{GatewayError, GatewayResult};
pub use pool::{AddressPool, BackendAddr, SharedPool};
pub use relay::{RelaySession, RelayStats};
pub use server::{Gateway, GatewayHandle, GatewayStats};
