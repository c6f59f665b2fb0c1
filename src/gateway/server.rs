//! The gateway: local TCP listener with backend failover.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::GatewayConfig;
use super::error::{GatewayError, GatewayResult};
use super::pool::{AddressPool, SharedPool};
use super::relay::RelaySession;

/// Gateway statistics snapshot.
#[derive(Debug, Clone, Default)]
pub struct GatewayStats {
    /// Total inbound connections accepted.
    pub total_accepted: u64,

    /// Inbound connections currently being relayed.
    pub active_connections: u64,

    /// Inbound connections dropped because no backend was reachable.
    pub failed_connects: u64,
}

/// Inner statistics (atomic counters).
#[derive(Debug, Default)]
struct StatsInner {
    total_accepted: AtomicU64,
    active_connections: AtomicU64,
    failed_connects: AtomicU64,
}

impl StatsInner {
    fn snapshot(&self) -> GatewayStats {
        GatewayStats {
            total_accepted: self.total_accepted.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            failed_connects: self.failed_connects.load(Ordering::Relaxed),
        }
    }
}

/// A bound gateway, ready to accept game-client connections.
///
/// Binding is separate from serving so a bind failure surfaces to the caller
/// as an error instead of dying inside a background task.
pub struct Gateway {
    listener: TcpListener,
    local_addr: SocketAddr,
    pool: SharedPool,
    config: GatewayConfig,
    stats: Arc<StatsInner>,
}

impl Gateway {
    /// Bind the local listener over the given backend hosts.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EmptyPool`] when `hosts` is empty and
    /// [`GatewayError::BindError`] when the listen address is unavailable.
    /// Both are fatal to the gateway; neither is retried.
    pub async fn bind(
        config: GatewayConfig,
        hosts: Vec<String>,
        backend_port: u16,
    ) -> GatewayResult<Self> {
        let pool = AddressPool::from_hosts(hosts, backend_port).ok_or(GatewayError::EmptyPool)?;
        Self::bind_with_pool(config, Arc::new(pool)).await
    }

    /// Bind the local listener over a pre-built address pool.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BindError`] when the listen address is
    /// unavailable.
    pub async fn bind_with_pool(config: GatewayConfig, pool: SharedPool) -> GatewayResult<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::BindError {
                address: addr,
                source: e,
            })?;

        let local_addr = listener.local_addr().map_err(|e| GatewayError::BindError {
            address: addr,
            source: e,
        })?;

        info!(address = %local_addr, backends = pool.len(), "Gateway listener bound");
        if let Some(ip) = crate::net::local_outbound_ip() {
            debug!(local_ip = %ip, "Outbound interface");
        }

        Ok(Self {
            listener,
            local_addr,
            pool,
            config,
            stats: Arc::new(StatsInner::default()),
        })
    }

    /// The bound local address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the accept loop on its own task and return a control handle.
    #[must_use]
    pub fn spawn(self) -> GatewayHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::clone(&self.stats);
        let local_addr = self.local_addr;

        let task = tokio::spawn(self.accept_loop(shutdown_rx));

        GatewayHandle {
            local_addr,
            stats,
            shutdown_tx,
            task,
        }
    }

    /// The main accept loop.
    async fn accept_loop(self, mut shutdown: watch::Receiver<bool>) {
        let Self {
            listener,
            local_addr,
            pool,
            config,
            stats,
        } = self;

        info!(address = %local_addr, "Gateway accept loop started");

        loop {
            let (inbound, peer_addr) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "Accept error");
                        continue;
                    },
                },
                _ = shutdown.changed() => {
                    info!(address = %local_addr, "Gateway shutting down");
                    break;
                },
            };

            stats.total_accepted.fetch_add(1, Ordering::Relaxed);
            stats.active_connections.fetch_add(1, Ordering::Relaxed);
            debug!(peer = %peer_addr, "Accepted game-client connection");

            let pool = Arc::clone(&pool);
            let config = config.clone();
            let stats = Arc::clone(&stats);

            tokio::spawn(async move {
                Self::handle_inbound(inbound, peer_addr, &pool, &config, &stats).await;
                stats.active_connections.fetch_sub(1, Ordering::Relaxed);
            });
        }
    }

    /// Relay one inbound connection, with backend failover.
    ///
    /// Exhausting every attempt closes the inbound connection without
    /// relaying; the gateway itself keeps serving.
    async fn handle_inbound(
        inbound: TcpStream,
        peer_addr: SocketAddr,
        pool: &AddressPool,
        config: &GatewayConfig,
        stats: &StatsInner,
    ) {
        let backend = match Self::connect_backend(pool, config).await {
            Ok(stream) => stream,
            Err(e) => {
                stats.failed_connects.fetch_add(1, Ordering::Relaxed);
                warn!(peer = %peer_addr, error = %e, "Dropping inbound connection");
                return;
            },
        };

        let (sent, received) = RelaySession::new(inbound, backend).run().await;
        debug!(peer = %peer_addr, sent, received, "Connection closed");
    }

    /// Try backends round-robin until one accepts or attempts run out.
    async fn connect_backend(
        pool: &AddressPool,
        config: &GatewayConfig,
    ) -> GatewayResult<TcpStream> {
        for attempt in 1..=config.connect_attempts {
            let target = pool.next();

            match timeout(
                config.connect_timeout(),
                TcpStream::connect((target.host.as_str(), target.port)),
            )
            .await
            {
                Ok(Ok(stream)) => {
                    info!(backend = %target, "Connected to backend");
                    return Ok(stream);
                },
                Ok(Err(e)) => {
                    warn!(attempt, backend = %target, error = %e, "Backend attempt failed");
                },
                Err(_) => {
                    warn!(attempt, backend = %target, "Backend attempt timed out");
                },
            }
        }

        Err(GatewayError::BackendsExhausted {
            attempts: config.connect_attempts,
        })
    }
}

/// Control handle for a spawned gateway.
pub struct GatewayHandle {
    local_addr: SocketAddr,
    stats: Arc<StatsInner>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl GatewayHandle {
    /// The bound local address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> GatewayStats {
        self.stats.snapshot()
    }

    /// Signal the accept loop to stop and wait for it to finish.
    ///
    /// Relay sessions already in flight run to completion; only the accept
    /// loop is stopped.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }

    /// Abort the accept loop without waiting.
    pub fn abort(&self) {
        self.task.abort();
    }
}
