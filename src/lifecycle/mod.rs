//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting and drains
//!             → limiter sweepers exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to every task
//! - Admission state is in-memory only; nothing is flushed on exit

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
