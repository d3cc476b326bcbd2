//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required fields and allowed environment names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use crate::config::schema::AppConfig;

const ALLOWED_ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("environment must be one of development, staging, production (got {0:?})")]
    Environment(String),
    #[error("{field} port {value:?} is not a valid port")]
    Port { field: &'static str, value: String },
}

/// Check a loaded configuration, returning every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app_name.trim().is_empty() {
        errors.push(ValidationError::Required("appName"));
    }
    if config.root_domain.trim().is_empty() {
        errors.push(ValidationError::Required("rootDomain"));
    }
    if config.environment.is_empty() {
        errors.push(ValidationError::Required("environment"));
    } else if !ALLOWED_ENVIRONMENTS.contains(&config.environment.as_str()) {
        errors.push(ValidationError::Environment(config.environment.clone()));
    }

    for (field, port) in [
        ("httpServerConfig", &config.http_server_config.port),
        ("grpcServerConfig", &config.grpc_server_config.port),
    ] {
        if !port.is_empty() && port.parse::<u16>().is_err() {
            errors.push(ValidationError::Port {
                field,
                value: port.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
