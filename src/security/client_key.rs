//! Client key extraction for admission control.
//!
//! # Responsibilities
//! - Derive a best-effort caller key from proxy headers
//! - Compose per-principal keys for authenticated operations
//! - Read the opaque principal id supplied by the upstream auth provider
//!
//! # Design Decisions
//! - Keys bucket callers for rate limiting only; they are never used for
//!   authorization and are not unique behind NAT.
//! - Callers with no address header share the `"unknown"` bucket. This keeps
//!   header-less traffic bounded instead of unlimited, at the cost of such
//!   callers competing for one quota.

use std::fmt;

use axum::http::HeaderMap;

use crate::security::sanitize::sanitize_text;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_PRINCIPAL_ID: &str = "x-principal-id";

/// Key used when no address can be derived.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Longest principal id accepted from the auth provider.
pub const PRINCIPAL_MAX_LEN: usize = 128;

/// Best-effort identifier bucketing callers for admission control.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `<principal>-<client>`: limits an authenticated identity per origin.
    pub fn for_principal(principal: &str, client: &ClientKey) -> Self {
        Self(format!("{}-{}", principal, client.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Derive the client key from request headers.
///
/// First entry of `X-Forwarded-For`, else `X-Real-IP`, else `"unknown"`.
/// Total and deterministic.
pub fn extract_key(headers: &HeaderMap) -> ClientKey {
    if let Some(first) = header_str(headers, X_FORWARDED_FOR)
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ClientKey::new(first);
    }

    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        return ClientKey::new(real_ip);
    }

    ClientKey::new(UNKNOWN_CLIENT)
}

/// Sanitized principal id, if the request carries one.
pub fn principal_from_headers(headers: &HeaderMap) -> Option<String> {
    let principal = sanitize_text(header_str(headers, X_PRINCIPAL_ID), PRINCIPAL_MAX_LEN);
    (!principal.is_empty()).then_some(principal)
}
