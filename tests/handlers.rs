//! End-to-end handler behaviour: validation before persistence, ownership,
//! and storage configuration.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use listing_guard::store::{RecordStore, Scalar};

mod common;
use common::{body_json, harness, request, send, test_config};

const ALICE: (&str, &str) = ("x-principal-id", "alice");
const BOB: (&str, &str) = ("x-principal-id", "bob");

fn listing_body(slug: &str) -> serde_json::Value {
    json!({
        "slug": slug,
        "title": "Sunny <b>two-bed</b> flat",
        "description": "Bright flat.\n<script>steal()</script>Close to the park.",
        "price": "1450",
        "bedrooms": 2,
        "bathrooms": "1",
        "website": "https://example.com/sunny",
        "contact_email": " Agent@Example.COM ",
    })
}

#[tokio::test]
async fn test_contact_submission_is_sanitized_stored_and_notified() {
    let h = harness(test_config(10, 10));

    let res = send(
        &h.router,
        request(
            "POST",
            "/api/contact",
            &[],
            Some(json!({
                "name": "  <Ana>  ",
                "email": " User@Example.COM ",
                "phone": "(91) 885-175-3005",
                "message": "Hello,\nI would like to visit.\u{0}",
            })),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    let id = body["id"].as_str().unwrap().to_string();

    let stored = h.records.get("inquiries", &id).await.unwrap().unwrap();
    assert_eq!(stored["name"], Scalar::Text("Ana".into()));
    assert_eq!(stored["email"], Scalar::Text("user@example.com".into()));
    assert_eq!(stored["phone"], Scalar::Text("918851753005".into()));
    assert_eq!(stored["message"], Scalar::Text("Hello,\nI would like to visit.".into()));
    assert_eq!(stored["listing_slug"], Scalar::Null);

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reply_to.as_deref(), Some("user@example.com"));
    assert_eq!(sent[0].subject, "New inquiry from Ana");
}

#[tokio::test]
async fn test_invalid_contact_field_is_rejected_by_name() {
    let h = harness(test_config(10, 10));

    let res = send(
        &h.router,
        request(
            "POST",
            "/api/contact",
            &[],
            Some(json!({ "name": "A", "email": "a@b.co", "message": "Long enough message" })),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["field"], "name");
    assert_eq!(body["error"], "Name must be at least 2 characters long");

    let res = send(
        &h.router,
        request(
            "POST",
            "/api/contact",
            &[],
            Some(json!({ "name": "Ana", "email": "not-an-email", "message": "Long enough message" })),
        ),
    )
    .await;
    assert_eq!(body_json(res).await["field"], "email");

    let res = send(
        &h.router,
        request(
            "POST",
            "/api/contact",
            &[],
            Some(json!({ "name": "Ana", "email": "a@b.co", "phone": "12345", "message": "Long enough message" })),
        ),
    )
    .await;
    assert_eq!(body_json(res).await["field"], "phone");

    assert!(h.records.is_empty());
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_contact_rejects_unknown_listing() {
    let h = harness(test_config(10, 10));
    let res = send(
        &h.router,
        request(
            "POST",
            "/api/contact",
            &[],
            Some(json!({
                "name": "Ana",
                "email": "a@b.co",
                "message": "About that listing...",
                "listing_slug": "does-not-exist",
            })),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["field"], "listing_slug");
}

#[tokio::test]
async fn test_non_string_fields_read_as_absent() {
    let h = harness(test_config(10, 10));
    let res = send(
        &h.router,
        request(
            "POST",
            "/api/contact",
            &[],
            Some(json!({ "name": ["A", "n", "a"], "email": "a@b.co", "message": "Long enough message" })),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["field"], "name");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = harness(test_config(10, 10));
    let req = Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = send(&h.router, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = send(&h.router, request("POST", "/api/contact", &[], Some(json!([1, 2])))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "Expected a JSON object");
}

#[tokio::test]
async fn test_listing_lifecycle() {
    let h = harness(test_config(20, 20));

    let res = send(&h.router, request("POST", "/api/listings", &[ALICE], Some(listing_body("sunny-flat")))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = body_json(res).await;
    assert_eq!(created["slug"], "sunny-flat");
    assert_eq!(created["title"], "Sunny btwo-bed/b flat");
    assert_eq!(created["description"], "Bright flat.\nClose to the park.");
    assert_eq!(created["price"], 1450.0);
    assert_eq!(created["bedrooms"], 2.0);
    assert_eq!(created["area"], serde_json::Value::Null);
    assert_eq!(created["website"], "https://example.com/sunny");
    assert_eq!(created["contact_email"], "agent@example.com");
    assert_eq!(created["owner"], "alice");

    let res = send(&h.router, request("GET", "/api/listings/sunny-flat", &[], None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["title"], "Sunny btwo-bed/b flat");

    let res = send(&h.router, request("POST", "/api/listings", &[ALICE], Some(listing_body("sunny-flat")))).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let mut update = listing_body("ignored");
    update["price"] = json!(1300);
    let res = send(&h.router, request("PUT", "/api/listings/sunny-flat", &[BOB], Some(update.clone()))).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = send(&h.router, request("PUT", "/api/listings/sunny-flat", &[ALICE], Some(update))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["price"], 1300.0);

    let res = send(&h.router, request("GET", "/api/listings", &[], None)).await;
    let all = body_json(res).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let res = send(&h.router, request("DELETE", "/api/listings/sunny-flat", &[BOB], None)).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = send(&h.router, request("DELETE", "/api/listings/sunny-flat", &[ALICE], None)).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = send(&h.router, request("GET", "/api/listings/sunny-flat", &[], None)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_writes_require_principal() {
    let h = harness(test_config(10, 10));
    let res = send(&h.router, request("POST", "/api/listings", &[], Some(listing_body("flat")))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = send(
        &h.router,
        request("POST", "/api/listings", &[("x-principal-id", "<>")], Some(listing_body("flat"))),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(h.records.is_empty());
}

#[tokio::test]
async fn test_listing_field_rejections() {
    let h = harness(test_config(20, 20));

    let mut bad_slug = listing_body("Sunny-Flat");
    let res = send(&h.router, request("POST", "/api/listings", &[ALICE], Some(bad_slug.clone()))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["field"], "slug");

    bad_slug["slug"] = json!("sunny-flat");
    bad_slug["price"] = json!("-5");
    let res = send(&h.router, request("POST", "/api/listings", &[ALICE], Some(bad_slug.clone()))).await;
    let body = body_json(res).await;
    assert_eq!(body["field"], "price");
    assert_eq!(body["error"], "Price must be at least 0");

    bad_slug["price"] = json!("1000");
    bad_slug["website"] = json!("javascript:alert(1)");
    let res = send(&h.router, request("POST", "/api/listings", &[ALICE], Some(bad_slug))).await;
    assert_eq!(body_json(res).await["field"], "website");

    let res = send(&h.router, request("GET", "/api/listings/Not_A_Slug", &[], None)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert!(h.records.is_empty());
}

#[tokio::test]
async fn test_upload_stores_under_principal_prefix() {
    let h = harness(test_config(10, 10));
    let req = Request::builder()
        .method("PUT")
        .uri("/api/uploads/photos//front.jpg")
        .header("x-principal-id", "auth0|alice")
        .body(Body::from("jpeg-bytes"))
        .unwrap();
    let res = send(&h.router, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["path"], "auth0_alice/photos/front.jpg");
    assert_eq!(body["bytes"], 10);
    assert_eq!(
        h.objects.get("auth0_alice/photos/front.jpg").as_deref(),
        Some(&b"jpeg-bytes"[..])
    );
}

#[tokio::test]
async fn test_upload_rejects_unsafe_paths_and_oversize_bodies() {
    let h = harness(test_config(10, 10));

    let req = Request::builder()
        .method("PUT")
        .uri("/api/uploads/photos/..%2Fsecret")
        .header("x-principal-id", "alice")
        .body(Body::from("x"))
        .unwrap();
    let res = send(&h.router, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("PUT")
        .uri("/api/uploads/big.bin")
        .header("x-principal-id", "alice")
        .body(Body::from(vec![0u8; 2048]))
        .unwrap();
    let res = send(&h.router, req).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(res).await["error"], "Payload exceeds 1024 bytes");

    // Exactly at the limit is accepted.
    let req = Request::builder()
        .method("PUT")
        .uri("/api/uploads/exact.bin")
        .header("x-principal-id", "alice")
        .body(Body::from(vec![0u8; 1024]))
        .unwrap();
    let res = send(&h.router, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(h.objects.len(), 1);

    let req = Request::builder()
        .method("PUT")
        .uri("/api/uploads/empty.bin")
        .header("x-principal-id", "alice")
        .body(Body::empty())
        .unwrap();
    let res = send(&h.router, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["field"], "body");
    assert_eq!(h.objects.len(), 1);
}

#[tokio::test]
async fn test_upload_without_credential_is_unavailable_and_free() {
    let mut config = test_config(1, 10);
    config.storage.service_key = None;
    let h = harness(config);

    for _ in 0..3 {
        let req = Request::builder()
            .method("PUT")
            .uri("/api/uploads/photo.jpg")
            .header("x-principal-id", "alice")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from("x"))
            .unwrap();
        let res = send(&h.router, req).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // The refused uploads did not spend the caller's form quota.
    assert_eq!(h.server.state().limiters.forms.tracked_keys(), 0);
}
