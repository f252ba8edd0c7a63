//! Health check handler.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Liveness probe; also reports subprocess slot utilization.
pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "subprocesses": {
            "active": state.sessions.active_count(),
            "max_concurrent": state.sessions.max_concurrent(),
        }
    }))
}
