//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration structure for the edgelink client core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    /// Hub control connection configuration.
    pub hub: HubSection,

    /// Local gateway relay configuration.
    pub gateway: GatewaySection,

    /// Health sampling configuration.
    pub health: HealthSection,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Hub control connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSection {
    /// Hub host name or address.
    pub host: String,

    /// Hub control port.
    pub port: u16,

    /// HTTP endpoint that echoes the caller's public IP.
    pub public_ip_url: String,
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 13300,
            public_ip_url: "https://api.ipify.org".to_string(),
        }
    }
}

/// Local gateway relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Bind address for the local listener.
    pub bind_address: IpAddr,

    /// Local port the game client connects to.
    pub local_port: u16,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            local_port: 13304,
        }
    }
}

/// Health sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    /// Name of the game process whose connection is monitored.
    pub process_name: String,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            process_name: "client".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: LogLevel,

    /// Log file path; stdout only when unset.
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file_path: None,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level (least verbose).
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.hub.port, 13300);
        assert_eq!(config.gateway.local_port, 13304);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: CoreConfig = toml::from_str(
            r#"
            [hub]
            host = "hub.example.net"
            port = 9100

            [health]
            process_name = "sro_client"
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.host, "hub.example.net");
        assert_eq!(config.hub.port, 9100);
        assert_eq!(config.health.process_name, "sro_client");
        // Untouched sections fall back to defaults
        assert_eq!(config.gateway.local_port, 13304);
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_roundtrip() {
        let config = CoreConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: CoreConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.hub.host, config.hub.host);
        assert_eq!(parsed.gateway.local_port, config.gateway.local_port);
    }
}
