//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → limiters, validators and stores built from it at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; limiter parameters never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    LimiterSettings, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig,
    StorageConfig, TimeoutConfig, ValidationConfig,
};
