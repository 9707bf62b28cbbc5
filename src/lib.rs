//! Listing service backend: admission control and input sanitization in
//! front of opaque record, object-storage and notification collaborators.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod store;

pub use config::ServiceConfig;
pub use error::AppError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
