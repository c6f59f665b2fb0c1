//! # Configuration System
//!
//! TOML-based configuration for the edgelink client core: hub endpoint,
//! local gateway binding, health sampling, and logging.
//!
//! ## Example Configuration
//!
//! ```toml
//! [hub]
//! host = "hub.example.net"
//! port = 13300
//!
//! [gateway]
//! bind_address = "127.0.0.1"
//! local_port = 13304
//! backend_port = 13304
//!
//! [health]
//! process_name = "sro_client"
//!
//! [logging]
//! level = "info"
//! ```

mod error;
mod loader;
mod types;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use types::{
    CoreConfig, GatewaySection, HealthSection, HubSection, LogLevel, LoggingConfig,
};
pub use validation::{
    BasicValidator, PortConflictValidator, ValidationError, ValidationResult, Validator,
};
