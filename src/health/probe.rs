//! Locating the monitored process's game connection in the OS socket table.

use std::net::SocketAddr;

use netstat2::{AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState};
use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

/// An established TCP connection belonging to the game process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConnection {
    /// Local endpoint of the connection.
    pub local: SocketAddr,

    /// Remote game-server endpoint.
    pub remote: SocketAddr,
}

/// Trait for finding the active game connection.
///
/// The production implementation walks the OS socket table; tests substitute
/// a fixed answer.
pub trait ConnectionProbe: Send {
    /// The game's established connection, if one exists right now.
    fn active_connection(&mut self) -> Option<GameConnection>;
}

/// Probe backed by the OS socket table and process list.
///
/// A connection qualifies when it is ESTABLISHED, owned by a process whose
/// name contains the monitored name, uses neither the gateway port nor the
/// hub port on either end, and does not point at loopback. The port filter
/// keeps the relay's own sockets and the control connection out of the
/// measurement.
pub struct SystemProbe {
    /// Lowercased fragment matched against process names.
    process_name: String,

    /// Ports excluded on both the local and remote end.
    excluded_ports: Vec<u16>,

    /// Process table, reused across refreshes.
    system: System,
}

impl SystemProbe {
    /// Create a probe for the named process, excluding the given ports.
    #[must_use]
    pub fn new(process_name: impl Into<String>, excluded_ports: Vec<u16>) -> Self {
        Self {
            process_name: process_name.into().to_lowercase(),
            excluded_ports,
            system: System::new(),
        }
    }

    /// PIDs of processes matching the monitored name.
    fn matching_pids(&mut self) -> Vec<u32> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        self.system
            .processes()
            .iter()
            .filter(|(_, process)| {
                process
                    .name()
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(&self.process_name)
            })
            .map(|(pid, _)| pid.as_u32())
            .collect()
    }
}

impl ConnectionProbe for SystemProbe {
    fn active_connection(&mut self) -> Option<GameConnection> {
        let pids = self.matching_pids();
        if pids.is_empty() {
            return None;
        }

        let af = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
        let sockets = match netstat2::get_sockets_info(af, ProtocolFlags::TCP) {
            Ok(sockets) => sockets,
            Err(e) => {
                debug!(error = %e, "Socket table walk failed");
                return None;
            },
        };

        for socket in sockets {
            let ProtocolSocketInfo::Tcp(tcp) = &socket.protocol_socket_info else {
                continue;
            };

            if tcp.state != TcpState::Established {
                continue;
            }
            if !socket.associated_pids.iter().any(|pid| pids.contains(pid)) {
                continue;
            }
            if self.excluded_ports.contains(&tcp.local_port)
                || self.excluded_ports.contains(&tcp.remote_port)
            {
                continue;
            }
            if tcp.remote_addr.is_loopback() {
                continue;
            }

            return Some(GameConnection {
                local: SocketAddr::new(tcp.local_addr, tcp.local_port),
                remote: SocketAddr::new(tcp.remote_addr, tcp.remote_port),
            });
        }

        None
    }
}
