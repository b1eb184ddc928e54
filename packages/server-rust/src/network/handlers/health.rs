//! Health and liveness endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns health information as JSON: uptime, registered operations and
/// handlers currently running.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let uptime_secs = state.start_time.elapsed().as_secs();
    let router = state.pipeline.router();
    let operations = router.operation_names();

    Json(json!({
        "state": "ready",
        "uptime_secs": uptime_secs,
        "operations": operations,
        "in_flight": router.in_flight(),
    }))
}

/// Liveness probe -- always returns 200 OK.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}
