//! Failure injection tests for the record service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use menagerie::store::MemoryBackend;
use reqwest::StatusCode;
use serde_json::json;

mod common;

use common::{CountingBackend, FailingBackend, SlowBackend};

#[tokio::test]
async fn test_wrong_credential_never_reaches_backend() {
    let backend = Arc::new(CountingBackend::default());
    let server = common::start_server(common::test_config(), backend.clone()).await;
    let intruder = server.client().with_credential("guess");

    let res = intruder.create("person", &json!({"name": "Mallory"})).await.unwrap();
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body, "Unauthorized");

    let res = intruder.get("person", "anyone").await.unwrap();
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    assert_eq!(backend.calls(), 0);

    // The right credential does reach it.
    server.client().get("person", "anyone").await.unwrap();
    assert!(backend.calls() > 0);
}

#[tokio::test]
async fn test_custom_credential_header() {
    let mut config = common::test_config();
    config.auth.header = "x-api-key".into();
    let server = common::start_server(config, Arc::new(MemoryBackend::default())).await;

    let res = server.client().get("person", "p1").await.unwrap();
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = server.client().with_header("x-api-key").get("person", "p1").await.unwrap();
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_slow_backend_times_out_without_late_write() {
    let backend = Arc::new(SlowBackend {
        inner: MemoryBackend::default(),
        delay: Duration::from_millis(400),
    });
    let mut config = common::test_config();
    config.timeouts.request_ms = 100;
    let server = common::start_server(config, backend.clone()).await;

    // PUT reads first (slow), then would create after the deadline.
    let start = Instant::now();
    let res = server
        .client()
        .replace("person", "late", &json!({"name": "Tardy"}))
        .await
        .unwrap();
    let waited = start.elapsed();

    assert_eq!(res.status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(res.body, "Request timed out");
    assert!(waited < Duration::from_millis(400), "response waited for handler: {waited:?}");

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(backend.inner.live_rows("person"), 0);
}

#[tokio::test]
async fn test_timeout_override_applies_to_one_route() {
    let backend = Arc::new(SlowBackend {
        inner: MemoryBackend::default(),
        delay: Duration::from_millis(200),
    });
    let mut config = common::test_config();
    config.timeouts.request_ms = 50;
    config.timeouts.overrides.push(menagerie::config::TimeoutOverride {
        resource: menagerie::resources::ResourceKind::Animal,
        operation: menagerie::routing::Operation::Read,
        request_ms: 2000,
    });
    let server = common::start_server(config, backend).await;
    let client = server.client();

    assert_eq!(client.get("animal", "x").await.unwrap().status, StatusCode::NOT_FOUND);
    assert_eq!(client.get("person", "x").await.unwrap().status, StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_backend_fault_is_internal_error() {
    let server = common::start_server(common::test_config(), Arc::new(FailingBackend)).await;
    let client = server.client();

    let res = client.get("animal", "a1").await.unwrap();
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.body.starts_with("Error retrieving"), "{}", res.body);

    let res = client.create("animal", &json!({"name": "Rex"})).await.unwrap();
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}
