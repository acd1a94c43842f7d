use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use shortlinks::gateway::{AppState, run_gateway_with_listener};
use shortlinks::logs::{RequestLogBuffer, SqliteLogStore};
use shortlinks::retention::{CleanupEngine, RetentionPolicy};

use crate::retention_harness::memory_store;

struct GatewayTestServer {
    port: u16,
    store: Arc<SqliteLogStore>,
    buffer: Arc<RequestLogBuffer>,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl GatewayTestServer {
    async fn start(buffer_capacity: usize) -> Self {
        let store = memory_store().await;
        let buffer = Arc::new(RequestLogBuffer::new(
            store.clone(),
            buffer_capacity,
            Duration::from_secs(5),
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let state = AppState {
            store: store.clone(),
            buffer: Some(buffer.clone()),
            scheduler: None,
        };
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_gateway_with_listener(
            listener,
            state,
            shutdown.clone(),
        ));

        Self {
            port,
            store,
            buffer,
            shutdown,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    async fn stop(self) -> (Arc<SqliteLogStore>, Arc<RequestLogBuffer>) {
        self.shutdown.cancel();
        self.handle
            .await
            .expect("gateway task should join")
            .expect("gateway should exit cleanly");
        (self.store, self.buffer)
    }
}

async fn wait_for_rows(store: &SqliteLogStore, expected: u64) {
    for _ in 0..100 {
        if store.count_raw_logs().await.unwrap() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {expected} request log rows to be flushed");
}

#[tokio::test]
async fn full_buffer_flushes_requests_to_the_store() {
    let server = GatewayTestServer::start(2).await;
    let today = Utc::now().date_naive();
    let client = reqwest::Client::new();

    let health = client
        .get(server.url("/healthz?check=1"))
        .header("X-Forwarded-For", "198.51.100.4, 10.0.0.1")
        .header("User-Agent", "retention-test")
        .send()
        .await
        .expect("health request should complete");
    assert_eq!(health.status(), StatusCode::OK);

    let missing = client
        .get(server.url("/go/does-not-exist"))
        .send()
        .await
        .expect("fallback request should complete");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    wait_for_rows(&server.store, 2).await;
    assert_eq!(server.buffer.pending_len(), 0);

    let engine = CleanupEngine::new(server.store.clone(), RetentionPolicy::default());
    let aggregate = engine
        .aggregate(today)
        .await
        .unwrap()
        .expect("today's requests should aggregate");
    assert_eq!(aggregate.total_requests, 2);
    assert_eq!(aggregate.status_2xx, 1);
    assert_eq!(aggregate.status_4xx, 1);
    assert_eq!(aggregate.error_count, 0);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn shutdown_drain_persists_buffered_requests() {
    let server = GatewayTestServer::start(100).await;
    let client = reqwest::Client::new();

    for path in ["/healthz", "/a", "/b"] {
        client
            .get(server.url(path))
            .send()
            .await
            .expect("request should complete");
    }
    assert_eq!(server.buffer.pending_len(), 3);
    assert_eq!(server.store.count_raw_logs().await.unwrap(), 0);

    drop(client);
    let (store, buffer) = server.stop().await;

    assert_eq!(buffer.drain().await, 3);
    assert_eq!(store.count_raw_logs().await.unwrap(), 3);
    assert_eq!(buffer.dropped_records(), 0);
}

#[tokio::test]
async fn health_reports_database_and_buffer() {
    let server = GatewayTestServer::start(50).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(server.url("/healthz"))
        .send()
        .await
        .expect("health request should complete")
        .json()
        .await
        .expect("health response should be json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["request_log"]["capacity"], 50);

    let status: Value = client
        .get(server.url("/retention/status"))
        .send()
        .await
        .expect("status request should complete")
        .json()
        .await
        .expect("status response should be json");
    assert_eq!(status["enabled"], false);

    drop(client);
    server.stop().await;
}
