//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, panic recovery, metrics)
//! - Attach the right limiter to each route group
//! - Run limiter sweepers alongside the server
//! - Bind server to listener, shut down gracefully
//!
//! # Route groups
//! ```text
//! /health                      no admission check
//! GET  /api/listings[/{slug}]  api limiter
//! POST /api/contact            forms limiter (per origin)
//! POST/PUT/DELETE /api/listings...  forms limiter (per principal + origin)
//! PUT  /api/uploads/{*path}    storage check → forms limiter (per principal + origin)
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ServiceConfig, StorageConfig, ValidationConfig};
use crate::http::handlers;
use crate::http::request::{RequestIdExt, RequestIdLayer};
use crate::observability::metrics;
use crate::security::rate_limit::{
    admission_middleware, principal_admission_middleware, spawn_sweeper, LimiterConfigError,
    Limiters,
};
use crate::store::{
    LogNotifier, MemoryObjectStore, MemoryRecordStore, Notifier, ObjectStore, RecordStore,
    StoreError,
};

/// Errors raised while assembling or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid limiter configuration: {0}")]
    Limiter(#[from] LimiterConfigError),

    #[error("object storage setup failed: {0}")]
    Storage(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub limiters: Limiters,
    pub records: Arc<dyn RecordStore>,
    /// `None` while no storage credential is configured.
    pub objects: Option<Arc<dyn ObjectStore>>,
    pub notifier: Arc<dyn Notifier>,
    pub validation: Arc<ValidationConfig>,
    pub storage: Arc<StorageConfig>,
}

impl AppState {
    /// State backed by the in-memory collaborators.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServerError> {
        let objects = match config.storage.service_key.as_deref() {
            Some(key) => {
                let store = MemoryObjectStore::new(config.storage.bucket.clone(), key)?;
                Some(Arc::new(store) as Arc<dyn ObjectStore>)
            }
            None => {
                tracing::warn!("No storage credential configured; uploads are disabled");
                None
            }
        };

        Ok(Self {
            limiters: Limiters::from_config(&config.limits)?,
            records: Arc::new(MemoryRecordStore::new()),
            objects,
            notifier: Arc::new(LogNotifier),
            validation: Arc::new(config.validation.clone()),
            storage: Arc::new(config.storage.clone()),
        })
    }

    pub fn with_records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = records;
        self
    }

    pub fn with_objects(mut self, objects: Option<Arc<dyn ObjectStore>>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// HTTP server for the listing service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with in-memory collaborators.
    pub fn new(config: ServiceConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config)?;
        Ok(Self::with_state(config, state))
    }

    /// Create a server around an already assembled state.
    pub fn with_state(config: ServiceConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let api_admission = middleware::from_fn_with_state(
            state.limiters.api.clone(),
            admission_middleware,
        );
        let forms_admission = middleware::from_fn_with_state(
            state.limiters.forms.clone(),
            admission_middleware,
        );
        let principal_admission = middleware::from_fn_with_state(
            state.limiters.forms.clone(),
            principal_admission_middleware,
        );

        let reads = Router::new()
            .route("/api/listings", get(handlers::list_listings))
            .route("/api/listings/{slug}", get(handlers::get_listing))
            .route_layer(api_admission);

        let submissions = Router::new()
            .route("/api/contact", post(handlers::submit_contact))
            .route_layer(forms_admission)
            .route_layer(DefaultBodyLimit::max(config.listener.max_body_bytes));

        let writes = Router::new()
            .route("/api/listings", post(handlers::create_listing))
            .route(
                "/api/listings/{slug}",
                put(handlers::update_listing).delete(handlers::delete_listing),
            )
            .route_layer(principal_admission.clone())
            .route_layer(DefaultBodyLimit::max(config.listener.max_body_bytes));

        // Credential check wraps admission so a misconfigured service does not
        // spend caller quota.
        let uploads = Router::new()
            .route("/api/uploads/{*path}", put(handlers::upload_object))
            .route_layer(principal_admission)
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                handlers::require_object_store,
            ))
            .route_layer(DefaultBodyLimit::max(config.storage.max_upload_bytes));

        Router::new()
            .route("/health", get(handlers::health))
            .merge(reads)
            .merge(submissions)
            .merge(writes)
            .merge(uploads)
            .with_state(state)
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request.headers().request_id(),
                )
            }))
            .layer(RequestIdLayer)
    }

    /// The assembled router, e.g. for driving it without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweep_interval = Duration::from_secs(self.config.limits.sweep_interval_secs);
        let sweepers: Vec<_> = self
            .state
            .limiters
            .all()
            .into_iter()
            .map(|limiter| spawn_sweeper(limiter.clone(), sweep_interval, shutdown.resubscribe()))
            .collect();

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        for sweeper in sweepers {
            if let Err(e) = sweeper.await {
                tracing::warn!(error = %e, "Sweeper task ended abnormally");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// A panicking handler answers 500 instead of tearing down the connection.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
