use super::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};

/// GET /healthz
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = state.store.health_check().await;
    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let request_log = state.buffer.as_ref().map(|buffer| {
        serde_json::json!({
            "pending": buffer.pending_len(),
            "capacity": buffer.capacity(),
            "dropped": buffer.dropped_records(),
        })
    });

    let body = serde_json::json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "database": if database_ok { "ok" } else { "unreachable" },
        "request_log": request_log,
    });
    (status, Json(body))
}

/// GET /retention/status: scheduler state and counters.
pub(super) async fn handle_retention_status(State(state): State<AppState>) -> impl IntoResponse {
    let Some(scheduler) = state.scheduler.as_ref() else {
        let body = serde_json::json!({ "enabled": false });
        return (StatusCode::OK, Json(body));
    };

    let body = serde_json::json!({
        "enabled": true,
        "state": scheduler.state(),
        "run_in_flight": scheduler.is_run_in_flight(),
        "metrics": scheduler.metrics(),
    });
    (StatusCode::OK, Json(body))
}

pub(super) async fn handle_not_found() -> impl IntoResponse {
    let body = serde_json::json!({ "error": "not found" });
    (StatusCode::NOT_FOUND, Json(body))
}
