//! Pong server integration tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use pingpong::decider::FixedSource;
use pingpong::telemetry::{DB_QUERIES_TOTAL, HTTP_REQUESTS_TOTAL};
use serde_json::Value;

use super::common::{instant_config, metric_value, TestServer};

#[tokio::test]
async fn test_ping_returns_pong() {
    let server = TestServer::spawn().await;

    let response = server.get("/ping").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "pong\n");

    server.stop().await;
}

#[tokio::test]
async fn test_ping_fails_above_success_prob() {
    let mut config = instant_config();
    config.pong.success_prob = 30.0;
    let server = TestServer::spawn_with_source(config, Arc::new(FixedSource(30.5))).await;

    let response = server.get("/ping").await;
    assert_eq!(response.status(), 500);

    server.stop().await;
}

#[tokio::test]
async fn test_ping_zero_success_prob_always_fails() {
    let mut config = instant_config();
    config.pong.success_prob = 0.0;
    config.pong.seed = Some(1);
    let server = TestServer::spawn_with_config(config).await;

    for _ in 0..10 {
        assert_eq!(server.get("/ping").await.status(), 500);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_ping_waits_for_decided_latency() {
    let mut config = instant_config();
    config.pong.latency = "100%200ms".to_string();
    let server = TestServer::spawn_with_config(config).await;

    let start = Instant::now();
    let response = server.get("/ping").await;
    assert_eq!(response.status(), 200);
    assert!(start.elapsed() >= Duration::from_millis(200));

    server.stop().await;
}

#[tokio::test]
async fn test_requests_are_counted_per_code() {
    let mut config = instant_config();
    config.pong.success_prob = 50.0;
    let server = TestServer::spawn_with_source(config, Arc::new(FixedSource(75.0))).await;

    for _ in 0..3 {
        server.get("/ping").await;
    }

    assert_eq!(
        server.registry.counter_value(
            HTTP_REQUESTS_TOTAL,
            &[("handler", "/ping"), ("method", "get"), ("code", "500")]
        ),
        3
    );

    let exposition = server.metrics().await;
    assert!(exposition.contains("# TYPE http_requests_total counter"));
    assert!(exposition.contains("# TYPE http_request_duration_seconds histogram"));
    assert_eq!(
        metric_value(
            &exposition,
            "http_requests_total{handler=\"/ping\",method=\"get\",code=\"500\"}"
        ),
        Some(3.0)
    );

    server.stop().await;
}

#[tokio::test]
async fn test_build_info_carries_app_version() {
    let mut config = instant_config();
    config.pong.app_version = "second".to_string();
    let server = TestServer::spawn_with_config(config).await;

    let exposition = server.metrics().await;
    assert!(exposition.contains("pong_build_info{version=\"second\""));

    let version: Value = server.get("/version").await.json().await.unwrap();
    assert_eq!(version["app_version"], "second");

    server.stop().await;
}

#[tokio::test]
async fn test_database_simulation_metrics() {
    let mut config = instant_config();
    config.database.enabled = true;
    config.database.latency = "100%0s".to_string();
    config.database.success_prob = 100.0;
    let server = TestServer::spawn_with_config(config).await;

    for _ in 0..4 {
        assert_eq!(server.get("/ping").await.status(), 200);
    }

    assert_eq!(
        server.registry.counter_value(
            DB_QUERIES_TOTAL,
            &[("operation", "select"), ("table", "users"), ("status", "success")]
        ),
        4
    );

    let exposition = server.metrics().await;
    assert!(exposition.contains("# TYPE db_query_duration_seconds histogram"));
    assert!(exposition.contains("db_rows_affected_count{operation=\"select\",table=\"users\"} 4"));

    server.stop().await;
}

#[tokio::test]
async fn test_failed_database_call_still_answers() {
    let mut config = instant_config();
    config.database.enabled = true;
    config.database.latency = "100%0s".to_string();
    config.database.success_prob = 0.0;
    config.database.error_types = "100%deadlock".to_string();
    let server = TestServer::spawn_with_source(config, Arc::new(FixedSource(10.0))).await;

    assert_eq!(server.get("/ping").await.status(), 200);
    assert_eq!(
        server.registry.counter_value(
            "db_query_errors_total",
            &[("operation", "select"), ("table", "users"), ("error_type", "deadlock")]
        ),
        1
    );

    server.stop().await;
}

#[tokio::test]
async fn test_health_and_readiness() {
    let server = TestServer::spawn().await;

    let health: Value = server.get("/health").await.json().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["drain"]["draining"], false);

    assert_eq!(server.get("/ready").await.status(), 200);
    assert_eq!(server.get("/readyz").await.status(), 200);

    server.shutdown_state().start_drain();
    assert_eq!(server.get("/ready").await.status(), 503);
    assert_eq!(server.get("/ping").await.status(), 503);
}

#[tokio::test]
async fn test_cancelled_work_abandons_pending_pings() {
    let mut config = instant_config();
    config.pong.latency = "100%1h".to_string();
    let server = TestServer::spawn_with_config(config).await;

    let client = server.client.clone();
    let url = server.url("/ping");
    let pending = tokio::spawn(async move { client.get(url).send().await });

    // Let the request reach the handler first.
    for _ in 0..50 {
        if server.shutdown_state().in_flight_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.shutdown_state().in_flight_count(), 1);

    server.shutdown_state().cancel_work();

    let response = pending.await.unwrap().unwrap();
    assert_eq!(response.status(), 503);
    assert_eq!(server.shutdown_state().in_flight_count(), 0);

    server.stop().await;
}
