//! Fixed-window admission control.
//!
//! # Responsibilities
//! - Bound accepted operations per client key to `max_requests` per window
//! - Report remaining quota and window end to callers
//! - Evict records whose window has elapsed (periodic sweep)
//!
//! # Design Decisions
//! - Fixed window, not sliding: a caller can burst up to `2 × max_requests`
//!   across a window boundary. Known characteristic, accepted for simplicity.
//! - Records live in a sharded `DashMap`. The entry guard holds the shard lock
//!   across lookup, expiry check and increment, so check-and-increment is
//!   atomic per key while keys on other shards proceed in parallel.
//! - Expired records are reclaimed by a periodic sweeper task instead of a
//!   random scan on the hot path.
//! - Never fails for ordinary input: any string is a valid key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::{mapref::entry::Entry, DashMap};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::LimitsConfig;
use crate::error::AppError;
use crate::http::response::apply_quota_headers;
use crate::observability::metrics;
use crate::security::client_key::{extract_key, principal_from_headers, ClientKey};

/// Longest window a limiter accepts.
pub const MAX_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Rejected limiter configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterConfigError {
    #[error("max_requests must be greater than zero")]
    ZeroRequests,

    #[error("window must be greater than zero")]
    ZeroWindow,

    #[error("window of {0:?} exceeds the maximum of {MAX_WINDOW:?}")]
    WindowTooLong(Duration),
}

/// Immutable limiter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    max_requests: u32,
    window: Duration,
}

impl LimiterConfig {
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, LimiterConfigError> {
        if max_requests == 0 {
            return Err(LimiterConfigError::ZeroRequests);
        }
        if window.is_zero() {
            return Err(LimiterConfigError::ZeroWindow);
        }
        if window > MAX_WINDOW {
            return Err(LimiterConfigError::WindowTooLong(window));
        }
        Ok(Self { max_requests, window })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Per-key counter. Only meaningful while `now < window_end`.
#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    window_end: Instant,
}

impl WindowRecord {
    fn open(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            window_end: now + window,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32, window_end: Instant },
    Denied { window_end: Instant },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }

    /// Remaining quota in the current window; zero when denied.
    pub fn remaining(&self) -> u32 {
        match self {
            Admission::Allowed { remaining, .. } => *remaining,
            Admission::Denied { .. } => 0,
        }
    }

    pub fn window_end(&self) -> Instant {
        match self {
            Admission::Allowed { window_end, .. } | Admission::Denied { window_end } => *window_end,
        }
    }

    /// Time left until the window resets, measured from `now`.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.window_end().saturating_duration_since(now)
    }
}

/// A named fixed-window limiter owning its own record store.
pub struct FixedWindowLimiter {
    name: &'static str,
    config: LimiterConfig,
    records: DashMap<String, WindowRecord>,
}

impl FixedWindowLimiter {
    pub fn new(name: &'static str, config: LimiterConfig) -> Self {
        Self {
            name,
            config,
            records: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> LimiterConfig {
        self.config
    }

    /// Check and record one operation for `key`.
    pub fn check(&self, key: &str) -> Admission {
        self.check_at(key, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(&self, key: &str, now: Instant) -> Admission {
        let max = self.config.max_requests;
        let window = self.config.window;

        let admission = match self.records.entry(key.to_owned()) {
            Entry::Vacant(slot) => {
                let record = WindowRecord::open(now, window);
                slot.insert(record);
                Admission::Allowed {
                    remaining: max - 1,
                    window_end: record.window_end,
                }
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if now >= record.window_end {
                    *record = WindowRecord::open(now, window);
                    Admission::Allowed {
                        remaining: max - 1,
                        window_end: record.window_end,
                    }
                } else if record.count < max {
                    record.count += 1;
                    Admission::Allowed {
                        remaining: max - record.count,
                        window_end: record.window_end,
                    }
                } else {
                    Admission::Denied {
                        window_end: record.window_end,
                    }
                }
            }
        };

        metrics::record_admission(self.name, admission.is_allowed());
        admission
    }

    /// Evict every record whose window has elapsed. Returns the number evicted.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| now < record.window_end);
        let after = self.records.len();
        metrics::record_tracked_keys(self.name, after);
        before.saturating_sub(after)
    }

    /// Number of keys currently holding a record.
    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }
}

impl std::fmt::Debug for FixedWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowLimiter")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

/// The independent limiters used by the service.
#[derive(Debug, Clone)]
pub struct Limiters {
    /// Form submissions and writes.
    pub forms: Arc<FixedWindowLimiter>,
    /// General read traffic.
    pub api: Arc<FixedWindowLimiter>,
}

impl Limiters {
    pub fn from_config(config: &LimitsConfig) -> Result<Self, LimiterConfigError> {
        Ok(Self {
            forms: Arc::new(FixedWindowLimiter::new("forms", config.forms.to_limiter_config()?)),
            api: Arc::new(FixedWindowLimiter::new("api", config.api.to_limiter_config()?)),
        })
    }

    pub fn all(&self) -> [&Arc<FixedWindowLimiter>; 2] {
        [&self.forms, &self.api]
    }
}

/// Spawn a task sweeping `limiter` every `interval` until shutdown.
pub fn spawn_sweeper(
    limiter: Arc<FixedWindowLimiter>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = limiter.sweep_expired(Instant::now());
                    if evicted > 0 {
                        tracing::debug!(
                            limiter = limiter.name(),
                            evicted,
                            tracked = limiter.tracked_keys(),
                            "Swept expired admission records"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!(limiter = limiter.name(), "Sweeper stopped");
                    break;
                }
            }
        }
    })
}

/// Admission middleware for anonymous routes, keyed on the client address.
///
/// Principal headers are ignored here: on routes that do not authenticate
/// them, a fresh value per request would otherwise mint a fresh bucket.
pub async fn admission_middleware(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = extract_key(request.headers());
    admit(&limiter, key, request, next).await
}

/// Admission middleware for routes that require a principal, keyed on
/// `<principal>-<address>`.
///
/// Requests without a principal fall back to the address alone and are
/// refused by the handler's extractor afterwards.
pub async fn principal_admission_middleware(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = extract_key(request.headers());
    let key = match principal_from_headers(request.headers()) {
        Some(principal) => ClientKey::for_principal(&principal, &client),
        None => client,
    };
    admit(&limiter, key, request, next).await
}

async fn admit(
    limiter: &FixedWindowLimiter,
    key: ClientKey,
    request: Request<Body>,
    next: Next,
) -> Response {
    let now = Instant::now();
    match limiter.check_at(key.as_str(), now) {
        Admission::Allowed { remaining, window_end } => {
            let mut response = next.run(request).await;
            apply_quota_headers(
                response.headers_mut(),
                limiter.config().max_requests(),
                remaining,
                window_end.saturating_duration_since(now),
            );
            response
        }
        denied @ Admission::Denied { .. } => {
            tracing::warn!(
                client = %key,
                limiter = limiter.name(),
                "Admission denied"
            );
            AppError::AdmissionDenied {
                limit: limiter.config().max_requests(),
                retry_after: denied.retry_after(now),
            }
            .into_response()
        }
    }
}
