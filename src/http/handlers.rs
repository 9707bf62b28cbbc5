//! Request handlers.
//!
//! Every handler runs after admission. Each payload field goes through its
//! validator before anything is handed to a collaborator; the first rejected
//! field ends the request with a 400 naming that field.

use axum::{
    body::{Body, Bytes},
    extract::{
        rejection::{BytesRejection, JsonRejection},
        Path, State,
    },
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::ValidationConfig;
use crate::error::AppError;
use crate::http::request::Principal;
use crate::http::server::AppState;
use crate::security::validate::{
    validate_email, validate_long_text, validate_message, validate_name, validate_number,
    validate_object_path, validate_phone, validate_slug, validate_text, validate_url, FieldError,
};
use crate::store::{Notification, Record, Scalar};

pub const LISTINGS: &str = "listings";
pub const INQUIRIES: &str = "inquiries";

const MAX_PRICE: f64 = 1e10;
const MAX_ROOMS: f64 = 50.0;
const MAX_AREA: f64 = 1e6;

/// JSON object body with lenient field access.
struct Payload(Map<String, Value>);

impl Payload {
    fn from_body(body: Result<Json<Value>, JsonRejection>) -> Result<Self, AppError> {
        match body {
            Ok(Json(Value::Object(map))) => Ok(Self(map)),
            Ok(Json(_)) => Err(AppError::BadRequest("Expected a JSON object".to_string())),
            Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
        }
    }

    /// String fields only; any other JSON type reads as absent.
    fn text(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Strings and numbers as text. Other types are passed through verbatim so
    /// the validator rejects them instead of silently dropping them.
    fn scalar(&self, field: &str) -> Option<String> {
        match self.0.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    fn is_supplied(&self, field: &str) -> bool {
        self.scalar(field).is_some_and(|v| !v.trim().is_empty())
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /api/contact`: inquiry about a listing or the agency.
pub async fn submit_contact(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let payload = Payload::from_body(body)?;
    let rules = &state.validation;

    let name = validate_name(payload.text("name"), rules.name_min_len).into_result("name")?;
    let email = validate_email(payload.text("email")).into_result("email")?;
    let phone = if payload.is_supplied("phone") {
        Some(validate_phone(payload.scalar("phone").as_deref()).into_result("phone")?)
    } else {
        None
    };
    let message = validate_message(
        payload.text("message"),
        rules.message_min_len,
        rules.message_max_len,
    )
    .into_result("message")?;

    let listing_slug = if payload.is_supplied("listing_slug") {
        let slug = validate_slug(payload.text("listing_slug")).into_result("listing_slug")?;
        if state.records.get(LISTINGS, &slug).await?.is_none() {
            return Err(FieldError {
                field: "listing_slug",
                reason: "The selected listing does not exist".to_string(),
            }
            .into());
        }
        Some(slug)
    } else {
        None
    };

    let id = Uuid::new_v4().to_string();
    let mut record = Record::new();
    record.insert("name".into(), name.clone().into());
    record.insert("email".into(), email.clone().into());
    record.insert("phone".into(), phone.into());
    record.insert("message".into(), message.clone().into());
    record.insert("listing_slug".into(), listing_slug.clone().into());
    state.records.put(INQUIRIES, &id, record).await?;

    let subject = match &listing_slug {
        Some(slug) => format!("New inquiry from {} about {}", name, slug),
        None => format!("New inquiry from {}", name),
    };
    let notification = Notification {
        kind: "inquiry",
        subject,
        reply_to: Some(email),
        body: message,
    };
    // The inquiry is already stored; a failed notification must not lose it.
    if let Err(e) = state.notifier.notify(notification).await {
        tracing::warn!(inquiry = %id, error = %e, "Inquiry notification failed");
    }

    tracing::info!(inquiry = %id, "Inquiry received");
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "status": "received" }))))
}

fn listing_json(slug: &str, mut record: Record) -> Value {
    record.insert("slug".into(), slug.into());
    json!(record)
}

fn optional<T>(
    payload: &Payload,
    field: &'static str,
    validate: impl FnOnce(&Payload) -> Result<T, FieldError>,
) -> Result<Option<T>, FieldError> {
    if payload.is_supplied(field) {
        validate(payload).map(Some)
    } else {
        Ok(None)
    }
}

/// Validate every listing field into a record owned by `owner`.
fn parse_listing(payload: &Payload, rules: &ValidationConfig, owner: &str) -> Result<Record, FieldError> {
    let title = validate_text(
        "Title",
        payload.text("title"),
        rules.title_min_len,
        rules.title_max_len,
    )
    .into_result("title")?;
    let description = validate_long_text(
        "Description",
        payload.text("description"),
        rules.description_min_len,
        rules.description_max_len,
    )
    .into_result("description")?;

    let number = |label: &str, field: &'static str, max: f64| {
        validate_number(label, payload.scalar(field).as_deref(), Some(0.0), Some(max))
            .into_result(field)
    };
    let price = number("Price", "price", MAX_PRICE)?;
    let bedrooms = number("Bedrooms", "bedrooms", MAX_ROOMS)?;
    let bathrooms = number("Bathrooms", "bathrooms", MAX_ROOMS)?;
    let area = number("Area", "area", MAX_AREA)?;

    let website = optional(payload, "website", |p| {
        validate_url(p.text("website")).into_result("website")
    })?;
    let contact_email = optional(payload, "contact_email", |p| {
        validate_email(p.text("contact_email")).into_result("contact_email")
    })?;

    let mut record = Record::new();
    record.insert("title".into(), title.into());
    record.insert("description".into(), description.into());
    record.insert("price".into(), price.into());
    record.insert("bedrooms".into(), bedrooms.into());
    record.insert("bathrooms".into(), bathrooms.into());
    record.insert("area".into(), area.into());
    record.insert("website".into(), website.into());
    record.insert("contact_email".into(), contact_email.into());
    record.insert("owner".into(), owner.into());
    Ok(record)
}

fn ensure_owner(record: &Record, principal: &Principal) -> Result<(), AppError> {
    match record.get("owner").and_then(Scalar::as_text) {
        Some(owner) if owner == principal.0 => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

/// `GET /api/listings`
pub async fn list_listings(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let listings: Vec<Value> = state
        .records
        .list(LISTINGS)
        .await?
        .into_iter()
        .map(|(slug, record)| listing_json(&slug, record))
        .collect();
    Ok(Json(Value::Array(listings)))
}

/// `GET /api/listings/{slug}`
pub async fn get_listing(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, AppError> {
    let slug = validate_slug(Some(&slug)).into_result("slug")?;
    let record = state
        .records
        .get(LISTINGS, &slug)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(listing_json(&slug, record)))
}

/// `POST /api/listings`
pub async fn create_listing(
    principal: Principal,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let payload = Payload::from_body(body)?;
    let slug = validate_slug(payload.text("slug")).into_result("slug")?;
    let record = parse_listing(&payload, &state.validation, &principal.0)?;

    if state.records.get(LISTINGS, &slug).await?.is_some() {
        return Err(AppError::Conflict(
            "A listing with this slug already exists".to_string(),
        ));
    }
    state.records.put(LISTINGS, &slug, record.clone()).await?;

    tracing::info!(slug = %slug, owner = %principal.0, "Listing created");
    Ok((StatusCode::CREATED, Json(listing_json(&slug, record))))
}

/// `PUT /api/listings/{slug}`: full replacement by the owner.
pub async fn update_listing(
    principal: Principal,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let slug = validate_slug(Some(&slug)).into_result("slug")?;
    let payload = Payload::from_body(body)?;
    let existing = state
        .records
        .get(LISTINGS, &slug)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_owner(&existing, &principal)?;

    let record = parse_listing(&payload, &state.validation, &principal.0)?;
    state.records.put(LISTINGS, &slug, record.clone()).await?;

    tracing::info!(slug = %slug, owner = %principal.0, "Listing updated");
    Ok(Json(listing_json(&slug, record)))
}

/// `DELETE /api/listings/{slug}`
pub async fn delete_listing(
    principal: Principal,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    let slug = validate_slug(Some(&slug)).into_result("slug")?;
    let existing = state
        .records
        .get(LISTINGS, &slug)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_owner(&existing, &principal)?;

    state.records.delete(LISTINGS, &slug).await?;
    tracing::info!(slug = %slug, owner = %principal.0, "Listing deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Principal ids are opaque (e.g. `auth0|123`); map them onto one safe path segment.
pub fn storage_prefix(principal: &str) -> String {
    let prefix: String = principal
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if prefix.is_empty() {
        "_".to_string()
    } else {
        prefix
    }
}

/// `PUT /api/uploads/{*path}`: raw body stored under the caller's prefix.
pub async fn upload_object(
    principal: Principal,
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let objects = state
        .objects
        .as_ref()
        .ok_or(AppError::ConfigurationMissing("object storage credential"))?;

    let path = validate_object_path(Some(&path)).into_result("path")?;
    // The route's body limit is the only size check; its rejection is 413.
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge {
                max_bytes: state.storage.max_upload_bytes,
            }
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    })?;
    if body.is_empty() {
        return Err(FieldError {
            field: "body",
            reason: "Uploaded file is empty".to_string(),
        }
        .into());
    }

    let key = format!("{}/{}", storage_prefix(&principal.0), path);
    let size = body.len();
    objects.put_object(&key, body).await?;

    tracing::info!(path = %key, bytes = size, "Object stored");
    Ok((StatusCode::CREATED, Json(json!({ "path": key, "bytes": size }))))
}

/// Refuse storage routes up front when no credential is configured.
pub async fn require_object_store(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.objects.is_none() {
        return AppError::ConfigurationMissing("object storage credential").into_response();
    }
    next.run(request).await
}
