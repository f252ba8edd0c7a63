//! Model list handler.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// List the configured model allow-list in OpenAI `/v1/models` shape.
pub async fn handle_list_models(State(state): State<AppState>) -> Json<Value> {
    let data: Vec<Value> = state
        .config
        .models
        .iter()
        .map(|id| json!({ "id": id, "object": "model" }))
        .collect();
    Json(json!({ "data": data }))
}
