//! Ping client integration tests

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pingpong::client::{spam_pings_every, PingStatus, Pinger, ERROR_CODE};
use pingpong::telemetry::{
    HttpClientMetrics, MetricsRegistry, HTTP_CLIENT_REQUESTS_INFLIGHT, HTTP_CLIENT_REQUESTS_TOTAL,
};

use super::common::TestServer;

async fn mock_pong(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(status).set_body_string("pong\n"))
        .mount(&server)
        .await;
    server
}

fn pinger(endpoint: &str, timeout: Duration) -> (Pinger, Arc<MetricsRegistry>) {
    let registry = Arc::new(MetricsRegistry::new());
    let pinger = Pinger::new(
        Url::parse(endpoint).unwrap(),
        timeout,
        HttpClientMetrics::new(registry.clone()),
    )
    .unwrap();
    (pinger, registry)
}

#[tokio::test]
async fn test_ping_records_status_code() {
    let server = mock_pong(200).await;
    let (pinger, registry) = pinger(&format!("{}/ping", server.uri()), Duration::from_secs(5));

    let status = pinger.ping(&CancellationToken::new()).await;
    assert_eq!(status, PingStatus::Response(200));
    assert_eq!(
        registry.counter_value(HTTP_CLIENT_REQUESTS_TOTAL, &[("method", "get"), ("code", "200")]),
        1
    );
    assert_eq!(registry.gauge_value(HTTP_CLIENT_REQUESTS_INFLIGHT, &[]), 0);
}

#[tokio::test]
async fn test_server_errors_are_responses() {
    let server = mock_pong(500).await;
    let (pinger, registry) = pinger(&format!("{}/ping", server.uri()), Duration::from_secs(5));

    assert_eq!(
        pinger.ping(&CancellationToken::new()).await,
        PingStatus::Response(500)
    );
    assert_eq!(
        registry.counter_value(HTTP_CLIENT_REQUESTS_TOTAL, &[("method", "get"), ("code", "500")]),
        1
    );
}

#[tokio::test]
async fn test_timeout_is_counted_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let (pinger, registry) = pinger(&format!("{}/ping", server.uri()), Duration::from_millis(100));

    let status = pinger.ping(&CancellationToken::new()).await;
    assert!(matches!(status, PingStatus::Failed(_)), "{:?}", status);
    assert_eq!(
        registry.counter_value(HTTP_CLIENT_REQUESTS_TOTAL, &[("method", "get"), ("code", ERROR_CODE)]),
        1
    );
}

#[tokio::test]
async fn test_cancel_interrupts_pending_ping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let (pinger, registry) = pinger(&format!("{}/ping", server.uri()), Duration::from_secs(30));

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    assert_eq!(pinger.ping(&cancel).await, PingStatus::Cancelled);
    assert_eq!(registry.gauge_value(HTTP_CLIENT_REQUESTS_INFLIGHT, &[]), 0);
}

#[tokio::test]
async fn test_dropped_ping_is_not_left_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let (pinger, registry) = pinger(&format!("{}/ping", server.uri()), Duration::from_secs(30));

    let cancel = CancellationToken::new();
    let abandoned = tokio::time::timeout(Duration::from_millis(100), pinger.ping(&cancel)).await;
    assert!(abandoned.is_err());
    assert_eq!(registry.gauge_value(HTTP_CLIENT_REQUESTS_INFLIGHT, &[]), 0);
}

#[tokio::test]
async fn test_spam_sends_bursts_until_cancelled() {
    let server = mock_pong(200).await;
    let (pinger, registry) = pinger(&format!("{}/ping", server.uri()), Duration::from_secs(5));

    let cancel = CancellationToken::new();
    let spam = tokio::spawn(spam_pings_every(
        Arc::new(pinger),
        3,
        Duration::from_millis(50),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(280)).await;
    cancel.cancel();
    let summary = spam.await.unwrap();

    assert!(summary.sent >= 3, "{:?}", summary);
    assert_eq!(summary.sent % 3, 0);
    assert_eq!(summary.sent, summary.responses + summary.failures + summary.cancelled);
    assert!(
        registry.counter_value(HTTP_CLIENT_REQUESTS_TOTAL, &[("method", "get"), ("code", "200")])
            >= 1
    );
}

#[tokio::test]
async fn test_ping_against_pong_server() {
    let pong = TestServer::spawn().await;
    let (pinger, registry) = pinger(&pong.url("/ping"), Duration::from_secs(5));

    for _ in 0..2 {
        assert_eq!(
            pinger.ping(&CancellationToken::new()).await,
            PingStatus::Response(200)
        );
    }
    assert_eq!(
        registry.counter_value(HTTP_CLIENT_REQUESTS_TOTAL, &[("method", "get"), ("code", "200")]),
        2
    );

    pong.stop().await;
}
