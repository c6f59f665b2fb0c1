//! # Hub Control Client
//!
//! One persistent control connection to the directory ("hub") service:
//! handshake, heartbeat, broadcast listening, join requests, and health
//! reporting, with a server cache the UI polls.
//!
//! ## Protocol
//!
//! Line-delimited JSON over TCP, except the very first hub frame: a raw
//! identifier the hub assigns at connect. See [`message`] for the envelope
//! and payload types.

mod cache;
mod client;
mod error;
pub mod message;

pub use cache::ServerCache;
pub use client::{
    HubClient, LogSink, BROADCAST_EMPTY_BACKOFF, BROADCAST_ERROR_BACKOFF, HANDSHAKE_TIMEOUT,
    HEALTH_REPORT_INTERVAL, HEARTBEAT_INTERVAL, RECONNECT_ATTEMPTS, WRITE_DRAIN_TIMEOUT,
};
pub use error::{HubError, HubResult};
pub use message::{Envelope, MessageData, ServerDescriptor};
