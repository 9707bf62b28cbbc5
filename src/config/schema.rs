//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::security::rate_limit::{LimiterConfig, LimiterConfigError};

/// Root configuration for the listing service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Admission control settings.
    pub limits: LimitsConfig,

    /// Field validation thresholds.
    pub validation: ValidationConfig,

    /// Object storage settings.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes (JSON endpoints).
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// One fixed-window limiter.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct LimiterSettings {
    /// Requests admitted per window per client key.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl LimiterSettings {
    pub fn to_limiter_config(&self) -> Result<LimiterConfig, LimiterConfigError> {
        LimiterConfig::new(self.max_requests, Duration::from_millis(self.window_ms))
    }
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Form submissions and writes (contact, listings, uploads).
    pub forms: LimiterSettings,

    /// General read traffic.
    pub api: LimiterSettings,

    /// Interval between sweeps of expired records, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            forms: LimiterSettings {
                max_requests: 5,
                window_ms: 15 * 60 * 1000,
            },
            api: LimiterSettings {
                max_requests: 100,
                window_ms: 60 * 1000,
            },
            sweep_interval_secs: 60,
        }
    }
}

/// Thresholds used by the field validators.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub name_min_len: usize,
    pub message_min_len: usize,
    pub message_max_len: usize,
    pub title_min_len: usize,
    pub title_max_len: usize,
    pub description_min_len: usize,
    pub description_max_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            name_min_len: 2,
            message_min_len: 10,
            message_max_len: 5000,
            title_min_len: 3,
            title_max_len: 200,
            description_min_len: 10,
            description_max_len: 10_000,
        }
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Elevated-privilege credential for object storage. Uploads are refused
    /// with 503 while unset.
    pub service_key: Option<String>,

    /// Bucket receiving uploads.
    pub bucket: String,

    /// Maximum upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            service_key: None,
            bucket: "listing-media".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "listing_guard=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
