//! Error taxonomy for request handling.
//!
//! # Design Decisions
//! - Admission and validation rejections are expected outcomes, logged at
//!   `warn`/`debug`, never as failures
//! - Internal errors are logged with detail but answered with a generic body
//! - `ConfigurationMissing` is the only condition that stops an otherwise
//!   valid request before it is attempted

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::http::response::{apply_quota_headers, retry_after_secs};
use crate::observability::metrics;
use crate::security::validate::FieldError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Transient; the caller may retry once the window resets.
    #[error("too many requests, retry in {retry_after:?}")]
    AdmissionDenied { limit: u32, retry_after: Duration },

    /// A single field was rejected; nothing reached persistence.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] FieldError),

    /// A required external dependency is not configured.
    #[error("{0} is not configured")]
    ConfigurationMissing(&'static str),

    #[error("authentication required")]
    Unauthorized,

    #[error("not permitted")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large")]
    PayloadTooLarge { max_bytes: usize },

    #[error("malformed request body: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::AdmissionDenied { limit, retry_after } => {
                let secs = retry_after_secs(retry_after);
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error": "Too many requests. Please try again later.",
                        "retry_after_secs": secs,
                        "remaining": 0,
                    })),
                )
                    .into_response();
                let headers = response.headers_mut();
                apply_quota_headers(headers, limit, 0, retry_after);
                headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            AppError::ValidationFailed(FieldError { field, reason }) => {
                metrics::record_validation_failure(field);
                tracing::debug!(field, reason = %reason, "Validation failed");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": reason, "field": field })),
                )
                    .into_response()
            }
            AppError::ConfigurationMissing(what) => {
                tracing::error!(dependency = what, "Required dependency not configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "Service temporarily unavailable" })),
                )
                    .into_response()
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "You do not have permission to modify this resource" })),
            )
                .into_response(),
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
            }
            AppError::Conflict(reason) => {
                (StatusCode::CONFLICT, Json(json!({ "error": reason }))).into_response()
            }
            AppError::PayloadTooLarge { max_bytes } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": format!("Payload exceeds {} bytes", max_bytes) })),
            )
                .into_response(),
            AppError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
            }
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
