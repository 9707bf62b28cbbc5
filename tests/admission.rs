//! Admission control as seen through the HTTP surface.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{body_json, harness, header, request, send, test_config};

const XFF: &str = "x-forwarded-for";

fn contact_body() -> serde_json::Value {
    json!({
        "name": "Ana Souza",
        "email": "ana@example.com",
        "message": "Is the flat still available?",
    })
}

#[tokio::test]
async fn test_quota_headers_count_down_then_reject() {
    let h = harness(test_config(3, 5));

    for expected in ["4", "3", "2", "1", "0"] {
        let res = send(&h.router, request("GET", "/api/listings", &[(XFF, "203.0.113.1")], None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(header(&res, "x-ratelimit-limit"), Some("5"));
        assert_eq!(header(&res, "x-ratelimit-remaining"), Some(expected));
        assert!(header(&res, "x-ratelimit-reset").is_some());
    }

    let res = send(&h.router, request("GET", "/api/listings", &[(XFF, "203.0.113.1")], None)).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&res, "x-ratelimit-remaining"), Some("0"));
    let retry_after: u64 = header(&res, "retry-after").unwrap().parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 60);

    let body = body_json(res).await;
    assert_eq!(body["remaining"], 0);
    assert!(body["retry_after_secs"].as_u64().unwrap() <= 60);
}

#[tokio::test]
async fn test_exhausted_client_does_not_affect_others() {
    let h = harness(test_config(3, 2));

    for _ in 0..3 {
        send(&h.router, request("GET", "/api/listings", &[(XFF, "198.51.100.1")], None)).await;
    }
    let blocked = send(&h.router, request("GET", "/api/listings", &[(XFF, "198.51.100.1")], None)).await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = send(&h.router, request("GET", "/api/listings", &[(XFF, "198.51.100.2")], None)).await;
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(header(&other, "x-ratelimit-remaining"), Some("1"));
}

#[tokio::test]
async fn test_forwarded_chain_keys_on_first_hop() {
    let h = harness(test_config(3, 1));

    let first = send(
        &h.router,
        request("GET", "/api/listings", &[(XFF, "192.0.2.9, 10.0.0.1")], None),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    // Same origin behind a different proxy hop shares the bucket.
    let second = send(
        &h.router,
        request("GET", "/api/listings", &[(XFF, "192.0.2.9, 10.0.0.2")], None),
    )
    .await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let real_ip = send(
        &h.router,
        request("GET", "/api/listings", &[("x-real-ip", "192.0.2.10")], None),
    )
    .await;
    assert_eq!(real_ip.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_headerless_callers_share_unknown_bucket() {
    let h = harness(test_config(3, 2));

    assert_eq!(send(&h.router, request("GET", "/api/listings", &[], None)).await.status(), StatusCode::OK);
    assert_eq!(send(&h.router, request("GET", "/api/listings", &[], None)).await.status(), StatusCode::OK);
    assert_eq!(
        send(&h.router, request("GET", "/api/listings", &[], None)).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_form_and_api_limiters_are_independent() {
    let h = harness(test_config(2, 10));
    let ip = [(XFF, "203.0.113.50")];

    for _ in 0..2 {
        let res = send(&h.router, request("POST", "/api/contact", &ip, Some(contact_body()))).await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }
    let res = send(&h.router, request("POST", "/api/contact", &ip, Some(contact_body()))).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let read = send(&h.router, request("GET", "/api/listings", &ip, None)).await;
    assert_eq!(read.status(), StatusCode::OK);
    assert_eq!(header(&read, "x-ratelimit-remaining"), Some("9"));
}

#[tokio::test]
async fn test_rejected_submission_is_not_persisted() {
    let h = harness(test_config(1, 10));
    let ip = [(XFF, "203.0.113.60")];

    send(&h.router, request("POST", "/api/contact", &ip, Some(contact_body()))).await;
    let denied = send(&h.router, request("POST", "/api/contact", &ip, Some(contact_body()))).await;
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(h.records.len(), 1);
}

#[tokio::test]
async fn test_principals_get_separate_quota_from_same_origin() {
    let h = harness(test_config(1, 10));

    let listing = |slug: &str| {
        json!({
            "slug": slug,
            "title": "Garden flat",
            "description": "Quiet street, close to the station.",
        })
    };

    let alice = [(XFF, "203.0.113.70"), ("x-principal-id", "alice")];
    let bob = [(XFF, "203.0.113.70"), ("x-principal-id", "bob")];

    let res = send(&h.router, request("POST", "/api/listings", &alice, Some(listing("alice-flat")))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = send(&h.router, request("POST", "/api/listings", &alice, Some(listing("alice-two")))).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let res = send(&h.router, request("POST", "/api/listings", &bob, Some(listing("bob-flat")))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_rotating_principal_header_does_not_reset_anonymous_quota() {
    let h = harness(test_config(1, 2));

    let mut statuses = Vec::new();
    for i in 0..5 {
        let principal = format!("visitor-{}", i);
        let headers = [(XFF, "203.0.113.5"), ("x-principal-id", principal.as_str())];
        let res = send(&h.router, request("POST", "/api/contact", &headers, Some(contact_body()))).await;
        statuses.push(res.status());
    }
    assert_eq!(statuses[0], StatusCode::CREATED);
    assert!(statuses[1..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
    assert_eq!(h.records.len(), 1);

    let mut reads = Vec::new();
    for i in 0..4 {
        let principal = format!("reader-{}", i);
        let headers = [(XFF, "203.0.113.5"), ("x-principal-id", principal.as_str())];
        let res = send(&h.router, request("GET", "/api/listings", &headers, None)).await;
        reads.push(res.status());
    }
    assert_eq!(
        reads,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );
}

#[tokio::test]
async fn test_health_is_never_limited() {
    let h = harness(test_config(1, 1));
    for _ in 0..5 {
        let res = send(&h.router, request("GET", "/health", &[], None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(header(&res, "x-ratelimit-remaining").is_none());
    }
}

#[tokio::test]
async fn test_sweep_reclaims_expired_records() {
    let mut config = test_config(3, 3);
    config.limits.api.window_ms = 20;
    let h = harness(config);

    for i in 0..4 {
        let ip = format!("198.51.100.{}", i);
        send(&h.router, request("GET", "/api/listings", &[(XFF, ip.as_str())], None)).await;
    }
    let api = h.server.state().limiters.api.clone();
    assert_eq!(api.tracked_keys(), 4);

    tokio::time::sleep(std::time::Duration::from_millis(40)).await;
    assert_eq!(api.sweep_expired(std::time::Instant::now()), 4);
    assert_eq!(api.tracked_keys(), 0);
}
