//! # edgelink
//!
//! Client-side networking core for a game-server directory and launcher.
//!
//! ## Components
//!
//! - [`gateway`] — a local TCP relay forwarding the game client's traffic to
//!   a backend game-server chosen round-robin from a pool, with per-connection
//!   failover.
//! - [`hub`] — the persistent control connection to the directory service:
//!   handshake, heartbeat, join requests, server-list broadcasts, and health
//!   reports.
//! - [`health`] — rolling quality statistics for the active game connection,
//!   sampled from the OS socket table and a timed echo.
//!
//! ## Architecture
//!
//! The hub client composes the other two: a user-initiated join spins up a
//! gateway for the chosen server's backend list, and a periodic task pulls a
//! digest from the health sampler and pushes it upstream. Each long-running
//! loop is an independent tokio task bound to one shared shutdown signal.
//! The graphical shell sits entirely outside this crate; it pulls from the
//! server cache and receives log lines through a callback sink.

pub mod config;
pub mod gateway;
pub mod health;
pub mod hub;
pub mod net;
