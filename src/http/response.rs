//! Response helpers.
//!
//! # Responsibilities
//! - Attach quota headers to admitted and rejected responses
//! - Convert window remainders into whole seconds for `Retry-After`

use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Whole seconds, rounded up so clients never retry early.
pub fn retry_after_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Informational quota headers. `reset_in` is the time until the window ends.
pub fn apply_quota_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_in: Duration) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(retry_after_secs(reset_in)));
}
