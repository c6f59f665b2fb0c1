//! Hub wire protocol: the JSON envelope and server descriptors.
//!
//! Every message between client and hub is one line of UTF-8 JSON:
//!
//! ```text
//! {"id": "<identifier>", "data": {"type": "<kind>", ...}, "timestamp": <unix seconds>}\n
//! ```
//!
//! The single exception is the identifier frame the hub sends right after
//! connect: raw bytes, not JSON, consumed once during the handshake.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A framed control message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Hub-assigned client identifier; empty before the handshake completes.
    #[serde(default)]
    pub id: String,

    /// The typed payload.
    pub data: MessageData,

    /// Unix timestamp in fractional seconds.
    #[serde(default)]
    pub timestamp: f64,
}

impl Envelope {
    /// Create an envelope stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, data: MessageData) -> Self {
        Self {
            id: id.into(),
            data,
            timestamp: unix_now(),
        }
    }

    /// Serialize to a newline-terminated JSON frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_frame(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut frame = serde_json::to_vec(self)?;
        frame.push(b'\n');
        Ok(frame)
    }

    /// Parse one frame (with or without its trailing newline).
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a valid envelope.
    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame.trim_end())
    }
}

/// Typed message payloads. The `type` field inside `data` selects the
/// variant; casing on the wire follows the hub protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageData {
    /// Client introduction, sent once after the identifier is received.
    Client {
        /// The client's public IP, `"0.0.0.0"` when discovery failed.
        client_ip: String,
        /// The hub control port.
        client_port: u16,
    },

    /// Periodic liveness signal.
    Heartbeat,

    /// Request to join a game-server.
    #[serde(rename = "join")]
    Join {
        /// Target server ID.
        target: String,
        /// Measured round trip to the target in milliseconds.
        ping: f64,
        /// Account name, or `"unknown"` for the guest path.
        username: String,
        /// MD5 hex digest of the password, or the raw value on the guest path.
        password: String,
        /// The client's public IP.
        ip: String,
    },

    /// Health digest report.
    #[serde(rename = "info")]
    Info {
        /// Fraction of up samples in the window.
        status: f64,
        /// Mean latency over the window in milliseconds.
        ping_latency: f64,
        /// Lost measurements in the window.
        packet_loss_count: u64,
        /// Mean sample timestamp.
        timestamp: f64,
    },

    /// Hub-initiated broadcast.
    #[serde(rename = "request")]
    Request {
        /// Broadcast kind; `"servers"` carries a server list.
        value: String,
        /// Payload; a list of server descriptors for `"servers"`.
        #[serde(default)]
        data: serde_json::Value,
    },
}

/// One server entry from a hub broadcast. Field names follow the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Server ID; the `target` of a join request.
    #[serde(rename = "ID")]
    pub id: String,

    /// Gateway host list for this server.
    #[serde(rename = "IP")]
    pub ip: Vec<String>,

    /// Backend port.
    #[serde(rename = "Port")]
    pub port: u16,

    /// Online/offline status label.
    pub status: String,

    /// Display name.
    pub name: String,

    /// Game mode label.
    pub mode: String,

    /// Current map label.
    pub map: String,

    /// Current player count.
    pub players: u32,

    /// Player capacity.
    pub max_players: u32,

    /// Hub-reported ping estimate in milliseconds.
    #[serde(default)]
    pub ping: f64,

    /// Download repository for the launcher, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// Current Unix time in fractional seconds.
#[must_use]
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
