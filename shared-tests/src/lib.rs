//! HTTP contract helpers shared by the classic and buffered APIs.
//!
//! The write-path contracts expect an app primed with exactly one record,
//! id 1, whose payload contains the marker string `test_load`; the
//! read-miss contract expects an app primed with an empty store.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub async fn run_health_contract(app: Router) {
    let (status, body) = request_json(
        app,
        Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .expect("valid health request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("status").and_then(Value::as_str), Some("ok"));
}

/// The two APIs acknowledge ingestion differently by design: the classic
/// API answers 201 once the row is durable, the buffered API answers 202
/// once the write is queued.
pub async fn run_ingest_contract(app: Router, expected: StatusCode, expected_label: &str) {
    let (status, body) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri("/api/v1/ingest")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "source": "load-generator",
                    "kind": "test_load"
                })
                .to_string(),
            ))
            .expect("valid ingest request"),
    )
    .await;

    assert_eq!(status, expected);
    assert_eq!(
        body.get("status").and_then(Value::as_str),
        Some(expected_label)
    );

    // A body that is not JSON is rejected before it reaches the pipeline.
    let status = request_status(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/ingest")
            .header("content-type", "application/json")
            .body(Body::from("not json at all"))
            .expect("valid malformed ingest request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

pub async fn run_read_random_contract(app: Router) {
    let (status, body) = request_json(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/v1/logs")
            .body(Body::empty())
            .expect("valid read request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("id").and_then(Value::as_i64), Some(1));
    assert!(body.get("payload").and_then(Value::as_str).is_some());
    assert!(body.get("created_at").and_then(Value::as_str).is_some());
}

/// Update must be visible to an immediately following read.
pub async fn run_update_contract(app: Router) {
    let (status, body) = request_json(
        app.clone(),
        Request::builder()
            .method("PATCH")
            .uri("/api/v1/logs")
            .body(Body::empty())
            .expect("valid update request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("id").and_then(Value::as_i64), Some(1));

    let (status, body) = request_json(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/v1/logs")
            .body(Body::empty())
            .expect("valid read-after-update request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let payload = body
        .get("payload")
        .and_then(Value::as_str)
        .expect("read after update must return the record");
    assert!(payload.contains("test_done"));
    assert!(!payload.contains("test_load"));
}

/// A miss is an explicit empty answer, not an error.
pub async fn run_read_miss_contract(app: Router) {
    let (status, body) = request_json(
        app,
        Request::builder()
            .method("GET")
            .uri("/api/v1/logs")
            .body(Body::empty())
            .expect("valid read-miss request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
}

pub async fn request_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request must not fail");
    let status = response.status();

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body must be readable")
        .to_bytes();
    let body = serde_json::from_slice::<Value>(&bytes).expect("body must be JSON");

    (status, body)
}

pub async fn request_status(app: Router, request: Request<Body>) -> StatusCode {
    let response = app.oneshot(request).await.expect("request must not fail");
    response.status()
}
