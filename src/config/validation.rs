//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, lengths ordered, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than zero"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    for (field, settings) in [("limits.forms", &config.limits.forms), ("limits.api", &config.limits.api)] {
        if let Err(e) = settings.to_limiter_config() {
            errors.push(ValidationError::new(field, e.to_string()));
        }
    }
    if config.limits.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("limits.sweep_interval_secs", "must be greater than zero"));
    }

    let v = &config.validation;
    if v.message_min_len > v.message_max_len {
        errors.push(ValidationError::new(
            "validation.message_min_len",
            "must not exceed validation.message_max_len",
        ));
    }
    if v.title_min_len > v.title_max_len {
        errors.push(ValidationError::new(
            "validation.title_min_len",
            "must not exceed validation.title_max_len",
        ));
    }
    if v.description_min_len > v.description_max_len {
        errors.push(ValidationError::new(
            "validation.description_min_len",
            "must not exceed validation.description_max_len",
        ));
    }

    if config.storage.max_upload_bytes == 0 {
        errors.push(ValidationError::new("storage.max_upload_bytes", "must be greater than zero"));
    }
    if matches!(config.storage.service_key.as_deref(), Some(key) if key.trim().is_empty()) {
        errors.push(ValidationError::new("storage.service_key", "must not be blank when set"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
