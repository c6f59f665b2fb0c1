//! Configuration validation system.

use super::types::CoreConfig;

/// A single validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
}

impl ValidationError {
    /// Create a new error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty (valid) result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if the validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Merge another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }
}

/// Trait for configuration validators.
pub trait Validator: std::fmt::Debug + Send + Sync {
    /// Validate a configuration and return any errors.
    fn validate(&self, config: &CoreConfig) -> ValidationResult;
}

/// Built-in validator for basic configuration checks.
#[derive(Debug, Default)]
pub struct BasicValidator;

impl BasicValidator {
    /// Create a new basic validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for BasicValidator {
    fn validate(&self, config: &CoreConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.hub.host.is_empty() {
            result.add_error(ValidationError::new("hub.host", "Hub host cannot be empty"));
        }

        if config.hub.port == 0 {
            result.add_error(ValidationError::new("hub.port", "Hub port cannot be 0"));
        }

        if config.gateway.local_port == 0 {
            result.add_error(ValidationError::new(
                "gateway.local_port",
                "Gateway local port cannot be 0",
            ));
        }

        if config.health.process_name.is_empty() {
            result.add_error(ValidationError::new(
                "health.process_name",
                "Monitored process name cannot be empty",
            ));
        }

        result
    }
}

/// Validator that rejects the gateway and hub sharing a port.
///
/// The health sampler excludes both ports when looking for the game
/// connection; a shared port would make the two indistinguishable.
#[derive(Debug, Default)]
pub struct PortConflictValidator;

impl PortConflictValidator {
    /// Create a new port conflict validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for PortConflictValidator {
    fn validate(&self, config: &CoreConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.gateway.local_port == config.hub.port {
            result.add_error(ValidationError::new(
                "gateway.local_port",
                format!(
                    "Gateway local port {} conflicts with the hub port",
                    config.gateway.local_port
                ),
            ));
        }

        result
    }
}
