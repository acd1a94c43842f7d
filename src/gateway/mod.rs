//! Axum HTTP gateway.
//!
//! Every request passes through the request-log middleware before routing.
//! Body size and handling time are capped by tower-http layers.

mod handlers;
pub mod middleware;

pub use middleware::{RequestUser, log_requests};

use crate::logs::{RequestLogBuffer, SqliteLogStore};
use crate::retention::Scheduler;
use anyhow::{Context, Result};
use axum::{Router, http::StatusCode, routing::get};
use handlers::{handle_health, handle_not_found, handle_retention_status};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteLogStore>,
    /// `None` when request logging is disabled
    pub buffer: Option<Arc<RequestLogBuffer>>,
    /// `None` when the retention scheduler is disabled
    pub scheduler: Option<Arc<Scheduler>>,
}

pub fn router(state: AppState) -> Router {
    let buffer = state.buffer.clone();

    let mut app = Router::new()
        .route("/healthz", get(handle_health))
        .route("/retention/status", get(handle_retention_status))
        .fallback(handle_not_found)
        .with_state(state);

    if let Some(buffer) = buffer {
        app = app.layer(axum::middleware::from_fn_with_state(buffer, log_requests));
    }

    app.layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Bind `host:port` and serve until `shutdown` is cancelled.
pub async fn run_gateway(
    host: &str,
    port: u16,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid gateway address {host}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    run_gateway_with_listener(listener, state, shutdown).await
}

/// Serve from a pre-bound listener until `shutdown` is cancelled.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!(
        addr = %local_addr,
        request_logging = state.buffer.is_some(),
        retention = state.scheduler.is_some(),
        "gateway listening"
    );

    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;

    tracing::info!(addr = %local_addr, "gateway stopped");
    Ok(())
}
