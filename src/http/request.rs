//! Request identification and caller context.
//!
//! # Responsibilities
//! - Assign a UUID v4 `x-request-id` when the client sent none, echo it back
//! - Expose the request id to spans and handlers
//! - Extract the authenticated principal for write operations

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderName},
};
use tower::Layer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestId, SetRequestId};

use crate::error::AppError;
use crate::security::client_key::principal_from_headers;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Sets and propagates `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = SetRequestId<PropagateRequestId<S>, MakeRequestUuid>;

    fn layer(&self, inner: S) -> Self::Service {
        SetRequestId::new(
            PropagateRequestId::new(inner, X_REQUEST_ID),
            X_REQUEST_ID,
            MakeRequestUuid,
        )
    }
}

pub trait RequestIdExt {
    /// The request id, or `"unknown"` before [`RequestIdLayer`] ran.
    fn request_id(&self) -> &str;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> &str {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Opaque principal id asserted by the upstream auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers)
            .map(Principal)
            .ok_or(AppError::Unauthorized)
    }
}
