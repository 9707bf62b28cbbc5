//! Admission control and input sanitization.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_key.rs (derive caller key from proxy headers)
//!     → rate_limit.rs (fixed-window admission check)
//!     → sanitize.rs + validate.rs (clean and check every payload field)
//!     → Pass to handler / collaborators
//! ```
//!
//! # Design Decisions
//! - Rejections are values (`Admission::Denied`, `Validation::Invalid`), never panics
//! - Sanitizers and validators are pure; only the limiters hold state
//! - No trust in client input

pub mod client_key;
pub mod rate_limit;
pub mod sanitize;
pub mod validate;

pub use client_key::{extract_key, ClientKey};
pub use rate_limit::{Admission, FixedWindowLimiter, LimiterConfig, Limiters};
pub use validate::{FieldError, Validation};
