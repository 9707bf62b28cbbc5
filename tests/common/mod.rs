//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use listing_guard::config::{LimiterSettings, ServiceConfig};
use listing_guard::http::{AppState, HttpServer};
use listing_guard::store::{
    MemoryObjectStore, MemoryRecordStore, Notification, Notifier, ObjectStore, StoreError,
};

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Config with small, explicit quotas and uploads enabled.
pub fn test_config(forms: u32, api: u32) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.limits.forms = LimiterSettings {
        max_requests: forms,
        window_ms: 60_000,
    };
    config.limits.api = LimiterSettings {
        max_requests: api,
        window_ms: 60_000,
    };
    config.storage.service_key = Some("test-service-key".to_string());
    config.storage.max_upload_bytes = 1024;
    config
}

/// A server plus handles on its in-memory collaborators.
pub struct Harness {
    pub server: HttpServer,
    pub router: Router,
    pub records: Arc<MemoryRecordStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(config: ServiceConfig) -> Harness {
    let records = Arc::new(MemoryRecordStore::new());
    let objects = Arc::new(MemoryObjectStore::new("test-media", "test-service-key").unwrap());
    let notifier = Arc::new(RecordingNotifier::default());

    let uploads_enabled = config.storage.service_key.is_some();
    let state = AppState::from_config(&config)
        .unwrap()
        .with_records(records.clone())
        .with_objects(uploads_enabled.then(|| objects.clone() as Arc<dyn ObjectStore>))
        .with_notifier(notifier.clone());

    let server = HttpServer::with_state(config, state);
    let router = server.router();
    Harness {
        server,
        router,
        records,
        objects,
        notifier,
    }
}

pub fn request(
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
