//! Common test utilities for integration tests
//!
//! Provides test server spawning and small metrics helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;

use pingpong::{
    config::PingPongConfig,
    decider::UniformSource,
    server::{create_router, serve, AppState, ShutdownState},
    telemetry::MetricsRegistry,
};

/// Test server wrapper
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub base_url: String,
    pub registry: Arc<MetricsRegistry>,
    shutdown: Arc<ShutdownState>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    /// Spawn a pong server answering instantly and always successfully
    pub async fn spawn() -> Self {
        Self::spawn_with_config(instant_config()).await
    }

    /// Spawn a pong server with custom configuration
    pub async fn spawn_with_config(config: PingPongConfig) -> Self {
        let state = AppState::new(config).unwrap();
        Self::spawn_with_state(state).await
    }

    /// Spawn a pong server drawing every decision from `source`
    pub async fn spawn_with_source(config: PingPongConfig, source: Arc<dyn UniformSource>) -> Self {
        let state = AppState::with_source(config, source).unwrap();
        Self::spawn_with_state(state).await
    }

    async fn spawn_with_state(state: AppState) -> Self {
        // Find an available port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let registry = state.registry.clone();
        let shutdown = state.shutdown.clone();
        let handle = tokio::spawn(serve(listener, create_router(state), shutdown.clone()));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        let base_url = format!("http://{}", addr);

        // Wait for health endpoint
        for _ in 0..50 {
            if client.get(format!("{}/health", base_url)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Self {
            addr,
            client,
            base_url,
            registry,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Get the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// Fetch `/metrics` as text
    pub async fn metrics(&self) -> String {
        self.get("/metrics").await.text().await.unwrap()
    }

    pub fn shutdown_state(&self) -> &Arc<ShutdownState> {
        &self.shutdown
    }

    /// Trigger a graceful shutdown and wait for the server to stop
    pub async fn stop(mut self) {
        self.shutdown.trigger_shutdown();
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(10), handle)
                .await
                .expect("server did not stop")
                .unwrap()
                .unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger_shutdown();
    }
}

/// Default configuration with zero latency and no failures
pub fn instant_config() -> PingPongConfig {
    let mut config = PingPongConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.pong.latency = "100%0s".to_string();
    config.pong.success_prob = 100.0;
    config
}

/// Find the value of the exposition line starting with `prefix`.
pub fn metric_value(exposition: &str, prefix: &str) -> Option<f64> {
    exposition
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find(|line| line.starts_with(prefix))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
