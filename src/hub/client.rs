//! The hub control client.

use std::panic::AssertUnwindSafe;
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use md5::{Digest, Md5};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{GatewaySection, HubSection};
use crate::gateway::{Gateway, GatewayConfig, GatewayHandle, GatewayResult};
use crate::health::HealthSampler;
use crate::net::{average_round_trip, Pinger, TcpPinger, DEFAULT_PING_MS};

use super::cache::ServerCache;
use super::error::{HubError, HubResult};
use super::message::{Envelope, MessageData, ServerDescriptor};

/// Interval between heartbeats once an identifier is assigned.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Interval between health digests pushed to the hub.
pub const HEALTH_REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Hard bound on draining one outbound frame.
pub const WRITE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Hard bound on the identifier frame arriving after connect.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff after an empty broadcast read.
pub const BROADCAST_EMPTY_BACKOFF: Duration = Duration::from_millis(500);

/// Backoff after a broadcast read or parse error.
pub const BROADCAST_ERROR_BACKOFF: Duration = Duration::from_secs(3);

/// Connect attempts before a write fails with `ReconnectExhausted`.
pub const RECONNECT_ATTEMPTS: u32 = 3;

/// First reconnect backoff; doubles per attempt.
const RECONNECT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Fire-and-forget callback mirroring log lines to an embedding UI console.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

type HubReader = BufReader<OwnedReadHalf>;

/// Client for the persistent hub control connection.
///
/// Owns one outbound TCP stream to the hub. The write half lives behind a
/// mutex whose lock serializes every writer (heartbeat, join, health report,
/// UI-triggered writes), so frames are never interleaved on the wire. The
/// read half is handed to the broadcast listener after each successful
/// connect.
///
/// Lifecycle: any read/write failure discards the stream and the client
/// falls back to Disconnected; the identifier survives. The next write runs
/// an explicit bounded reconnect ([`RECONNECT_ATTEMPTS`] attempts with
/// doubling backoff) rather than retrying forever.
pub struct HubClient {
    hub: HubSection,
    gateway: GatewaySection,

    /// Write half of the control connection; the lock is the write lock.
    writer: Mutex<Option<OwnedWriteHalf>>,

    /// Fresh read halves for the broadcast listener, one per connect.
    reader_tx: mpsc::Sender<HubReader>,
    reader_rx: StdMutex<Option<mpsc::Receiver<HubReader>>>,

    /// Hub-assigned identifier; empty until the handshake completes.
    identifier: StdMutex<String>,

    /// Discovered public IP, `"0.0.0.0"` until discovery succeeds.
    public_ip: StdMutex<String>,

    /// Broadcast server cache, shared with the UI poll.
    cache: ServerCache,

    /// Health sampler queried by the report loop.
    sampler: Mutex<HealthSampler>,

    /// Round-trip facility for join requests.
    pinger: Box<dyn Pinger>,

    /// Optional UI console sink.
    log_sink: StdMutex<Option<LogSink>>,

    /// Shutdown signal shared by all loops.
    shutdown: watch::Sender<bool>,
}

impl HubClient {
    /// Create a client with the production round-trip facility.
    #[must_use]
    pub fn new(hub: HubSection, gateway: GatewaySection, sampler: HealthSampler) -> Arc<Self> {
        Self::with_pinger(hub, gateway, sampler, Box::new(TcpPinger::new()))
    }

    /// Create a client with an explicit round-trip facility (the test seam).
    #[must_use]
    pub fn with_pinger(
        hub: HubSection,
        gateway: GatewaySection,
        sampler: HealthSampler,
        pinger: Box<dyn Pinger>,
    ) -> Arc<Self> {
        let (reader_tx, reader_rx) = mpsc::channel(4);
        let (shutdown, _) = watch::channel(false);

        Arc::new(Self {
            hub,
            gateway,
            writer: Mutex::new(None),
            reader_tx,
            reader_rx: StdMutex::new(Some(reader_rx)),
            identifier: StdMutex::new(String::new()),
            public_ip: StdMutex::new(crate::net::UNKNOWN_IP.to_string()),
            cache: ServerCache::new(),
            sampler: Mutex::new(sampler),
            pinger,
            log_sink: StdMutex::new(None),
            shutdown,
        })
    }

    /// Register the UI console sink.
    pub fn set_log_sink(&self, sink: LogSink) {
        if let Ok(mut guard) = self.log_sink.lock() {
            *guard = Some(sink);
        }
    }

    /// The hub-assigned identifier; empty before the handshake.
    #[must_use]
    pub fn identifier(&self) -> String {
        self.identifier.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// The discovered public IP.
    #[must_use]
    pub fn public_ip(&self) -> String {
        self.public_ip.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Whether a control connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    /// The broadcast server cache, for UI enumeration.
    #[must_use]
    pub fn cache(&self) -> &ServerCache {
        &self.cache
    }

    /// Discover and store this client's public IP.
    pub async fn discover_ip(&self) {
        let ip = crate::net::discover_public_ip(&self.hub.public_ip_url).await;
        if let Ok(mut guard) = self.public_ip.lock() {
            *guard = ip;
        }
    }

    /// Connect and handshake once.
    ///
    /// # Errors
    ///
    /// Returns an error when the hub is unreachable or sends no identifier.
    /// A no-op when already connected.
    pub async fn connect(&self) -> HubResult<()> {
        let mut guard = self.writer.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let writer = self.establish().await?;
        *guard = Some(writer);
        Ok(())
    }

    /// Discover the public IP, connect, and spawn the heartbeat, broadcast
    /// listener, and health-report loops.
    ///
    /// # Errors
    ///
    /// Returns an error when the initial bounded connect fails; the loops
    /// are not spawned in that case.
    pub async fn start(self: &Arc<Self>) -> HubResult<Vec<JoinHandle<()>>> {
        self.discover_ip().await;

        {
            let mut guard = self.writer.lock().await;
            if guard.is_none() {
                self.ensure_connected(&mut guard).await?;
            }
        }

        Ok(vec![
            tokio::spawn(Arc::clone(self).heartbeat_loop()),
            tokio::spawn(Arc::clone(self).broadcast_loop()),
            tokio::spawn(Arc::clone(self).health_report_loop()),
        ])
    }

    /// Signal every loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Send a message, reconnecting first when disconnected.
    ///
    /// The write lock serializes concurrent callers; each frame reaches the
    /// wire whole. On failure the stream is discarded and the error
    /// surfaces to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error when reconnection is exhausted, serialization
    /// fails, or the frame cannot be written within the drain timeout.
    pub async fn write(&self, data: MessageData) -> HubResult<()> {
        let mut guard = self.writer.lock().await;
        if guard.is_none() {
            self.ensure_connected(&mut guard).await?;
        }

        let envelope = Envelope::new(self.identifier(), data);
        let writer = guard.as_mut().ok_or(HubError::NotConnected)?;

        match write_frame(writer, &envelope).await {
            Ok(()) => {
                debug!(kind = %kind_of(&envelope.data), "Frame sent");
                Ok(())
            },
            Err(e) => {
                *guard = None;
                warn!(error = %e, "Hub write failed, dropping connection");
                self.ui_log(&format!("Hub write failed: {e}"));
                Err(e)
            },
        }
    }

    /// Request to join a server.
    ///
    /// Blank credentials take the guest path: username `"unknown"` and the
    /// password forwarded as-is. Otherwise the password field carries the
    /// MD5 hex digest of the trimmed input. The ping estimate falls back to
    /// [`DEFAULT_PING_MS`] when the target's address list cannot be
    /// measured.
    ///
    /// # Errors
    ///
    /// Returns an error when the join message cannot be delivered.
    pub async fn join_server(
        &self,
        server: &ServerDescriptor,
        username: &str,
        password: &str,
    ) -> HubResult<()> {
        let username = username.trim();
        let password = password.trim();

        let (username, password) = if username.is_empty() || password.is_empty() {
            ("unknown".to_string(), password.to_string())
        } else {
            (username.to_string(), md5_hex(password))
        };

        let ping = match average_round_trip(self.pinger.as_ref(), &server.ip, server.port).await {
            Some(ping) => ping,
            None => {
                warn!(server = %server.id, "Ping measurement failed, using default estimate");
                DEFAULT_PING_MS
            },
        };

        info!(server = %server.id, ping, username = %username, "Joining server");
        self.ui_log(&format!("Joining server {} (ping {ping} ms)", server.name));

        self.write(MessageData::Join {
            target: server.id.clone(),
            ping,
            username,
            password,
            ip: self.public_ip(),
        })
        .await
    }

    /// Push the current health digest to the hub.
    ///
    /// A no-op until the handshake has assigned an identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the report cannot be delivered.
    pub async fn inform_health(&self) -> HubResult<()> {
        if self.identifier().is_empty() {
            debug!("No identifier yet, skipping health report");
            return Ok(());
        }

        let digest = {
            let mut sampler = self.sampler.lock().await;
            sampler.digest().await
        };

        self.write(MessageData::Info {
            status: digest.status,
            ping_latency: digest.ping_latency,
            packet_loss_count: digest.packet_loss_count,
            timestamp: digest.timestamp,
        })
        .await
    }

    /// Pop the oldest cached server descriptor.
    ///
    /// Returns `None` while the cache holds one entry or fewer; a concurrent
    /// broadcast producer is never raced down to an empty cache.
    pub async fn scan_server(&self) -> Option<ServerDescriptor> {
        self.cache.pop_oldest().await
    }

    /// Spin up a gateway for the chosen server's backend list.
    ///
    /// The gateway runs on its own task and never blocks the control
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns an error when the host list is empty or the local port
    /// cannot be bound.
    pub async fn start_gateway(
        &self,
        hosts: Vec<String>,
        backend_port: u16,
    ) -> GatewayResult<GatewayHandle> {
        let config = GatewayConfig::new(self.gateway.local_port)
            .with_bind_address(self.gateway.bind_address);

        let gateway = Gateway::bind(config, hosts, backend_port).await?;
        let local_addr = gateway.local_addr();

        info!(address = %local_addr, "Gateway started for join");
        self.ui_log(&format!("Gateway listening on {local_addr}"));

        Ok(gateway.spawn())
    }

    /// Bounded reconnect with doubling backoff.
    async fn ensure_connected(&self, guard: &mut Option<OwnedWriteHalf>) -> HubResult<()> {
        let mut backoff = RECONNECT_BACKOFF_BASE;

        for attempt in 1..=RECONNECT_ATTEMPTS {
            match self.establish().await {
                Ok(writer) => {
                    *guard = Some(writer);
                    return Ok(());
                },
                Err(e) => {
                    warn!(attempt, error = %e, "Hub connect attempt failed");
                    if attempt < RECONNECT_ATTEMPTS {
                        sleep(backoff).await;
                        backoff *= 2;
                    }
                },
            }
        }

        self.ui_log("Hub unreachable");
        Err(HubError::ReconnectExhausted {
            attempts: RECONNECT_ATTEMPTS,
        })
    }

    /// Connect, run the handshake, and hand the reader to the listener.
    ///
    /// The identifier arrives as one frame of raw bytes (not JSON) right
    /// after connect; receiving nothing leaves the client disconnected. The
    /// `Client` introduction is then the first JSON frame out.
    async fn establish(&self) -> HubResult<OwnedWriteHalf> {
        let address = format!("{}:{}", self.hub.host, self.hub.port);

        let stream = TcpStream::connect((self.hub.host.as_str(), self.hub.port))
            .await
            .map_err(|e| HubError::ConnectFailed {
                address: address.clone(),
                source: e,
            })?;

        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut writer = write_half;

        let mut buf = [0u8; 1024];
        let n = timeout(HANDSHAKE_TIMEOUT, reader.read(&mut buf))
            .await
            .map_err(|_| HubError::HandshakeFailed)?
            .map_err(|_| HubError::HandshakeFailed)?;
        if n == 0 {
            return Err(HubError::HandshakeFailed);
        }

        let identifier = String::from_utf8_lossy(&buf[..n]).trim().to_string();
        if identifier.is_empty() {
            return Err(HubError::HandshakeFailed);
        }

        if let Ok(mut guard) = self.identifier.lock() {
            *guard = identifier.clone();
        }

        let introduction = Envelope::new(
            identifier.clone(),
            MessageData::Client {
                client_ip: self.public_ip(),
                client_port: self.hub.port,
            },
        );
        write_frame(&mut writer, &introduction).await?;

        // The listener drains stale readers; losing this send only delays
        // broadcasts until the next reconnect.
        if self.reader_tx.try_send(reader).is_err() {
            debug!("Broadcast listener not consuming readers");
        }

        info!(address = %address, identifier = %identifier, "Hub connected");
        self.ui_log(&format!("Hub connected as {identifier}"));

        Ok(writer)
    }

    /// Heartbeat loop: every [`HEARTBEAT_INTERVAL`] once an identifier is
    /// assigned. Failures are logged and swallowed; the loop only exits on
    /// shutdown.
    async fn heartbeat_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = interval(HEARTBEAT_INTERVAL);
        ticker.tick().await;

        info!("Heartbeat loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.identifier().is_empty() {
                        continue;
                    }
                    if let Err(e) = self.write(MessageData::Heartbeat).await {
                        warn!(error = %e, "Heartbeat failed");
                    }
                },
                _ = shutdown.changed() => break,
            }
        }

        info!("Heartbeat loop stopped");
    }

    /// Health-report loop: every [`HEALTH_REPORT_INTERVAL`].
    async fn health_report_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = interval(HEALTH_REPORT_INTERVAL);
        ticker.tick().await;

        info!("Health report loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.inform_health().await {
                        warn!(error = %e, "Health report failed");
                    }
                },
                _ = shutdown.changed() => break,
            }
        }

        info!("Health report loop stopped");
    }

    /// Broadcast listener loop.
    ///
    /// An empty read is not connection loss: the loop backs off briefly and
    /// retries, and picks up the fresh reader the next reconnect produces.
    /// Malformed frames are logged, dropped, and followed by a longer
    /// backoff.
    async fn broadcast_loop(self: Arc<Self>) {
        let Some(mut rx) = self.reader_rx.lock().ok().and_then(|mut g| g.take()) else {
            warn!("Broadcast listener already running");
            return;
        };

        let mut shutdown = self.shutdown.subscribe();
        let mut current: Option<HubReader> = None;

        info!("Broadcast listener started");

        loop {
            // A reconnect supersedes whatever reader we were draining.
            while let Ok(fresh) = rx.try_recv() {
                debug!("Broadcast reader refreshed");
                current = Some(fresh);
            }

            match current.as_mut() {
                None => {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        reader = rx.recv() => match reader {
                            Some(reader) => current = Some(reader),
                            None => break,
                        },
                    }
                },
                Some(reader) => {
                    let mut line = String::new();
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        result = reader.read_line(&mut line) => match result {
                            Ok(0) => sleep(BROADCAST_EMPTY_BACKOFF).await,
                            Ok(_) => {
                                if !self.handle_frame(&line).await {
                                    sleep(BROADCAST_ERROR_BACKOFF).await;
                                }
                            },
                            Err(e) => {
                                warn!(error = %e, "Broadcast read error");
                                sleep(BROADCAST_ERROR_BACKOFF).await;
                            },
                        },
                    }
                },
            }
        }

        info!("Broadcast listener stopped");
    }

    /// Dispatch one hub frame. Returns false when the frame failed to parse.
    ///
    /// A frame that is valid JSON but not a `servers` broadcast is ignored
    /// without penalty; only unparsable bytes cost the listener its error
    /// backoff.
    async fn handle_frame(&self, line: &str) -> bool {
        let value: serde_json::Value = match serde_json::from_str(line.trim_end()) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Malformed hub frame");
                return false;
            },
        };

        debug!(frame = %value, "Hub frame received");

        let data = &value["data"];
        if data["type"] != "request" || data["value"] != "servers" {
            return true;
        }

        let Some(items) = data["data"].as_array() else {
            warn!("Invalid server list payload");
            self.ui_log("Invalid server list payload");
            return true;
        };

        let mut servers = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<ServerDescriptor>(item.clone()) {
                Ok(server) => servers.push(server),
                Err(e) => warn!(error = %e, "Dropping malformed server entry"),
            }
        }

        let count = servers.len();
        self.cache.push_all(servers).await;
        info!(count, "Server list updated");
        self.ui_log(&format!("Server list updated: {count} servers"));

        true
    }

    /// Mirror a message to the UI console sink, if one is registered.
    ///
    /// The sink contract is fire-and-forget: a panicking callback is
    /// contained here and never reaches the caller.
    fn ui_log(&self, message: &str) {
        let sink = self
            .log_sink
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None);

        if let Some(sink) = sink {
            let _ = std::panic::catch_unwind(AssertUnwindSafe(|| sink(message)));
        }
    }
}

/// Serialize and send one frame, bounded by the drain timeout.
async fn write_frame(writer: &mut OwnedWriteHalf, envelope: &Envelope) -> HubResult<()> {
    let frame = envelope.to_frame()?;

    timeout(WRITE_DRAIN_TIMEOUT, async {
        writer.write_all(&frame).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| HubError::DrainTimeout)?
    .map_err(HubError::WriteFailed)
}

/// MD5 hex digest of a credential string.
fn md5_hex(input: &str) -> String {
    let digest = Md5::digest(input.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Short label for a payload, for logging.
fn kind_of(data: &MessageData) -> &'static str {
    match data {
        MessageData::Client { .. } => "Client",
        MessageData::Heartbeat => "Heartbeat",
        MessageData::Join { .. } => "join",
        MessageData::Info { .. } => "info",
        MessageData::Request { .. } => "request",
    }
}
