//! Server setup and routing.

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::{handlers, state::AppState};

/// Create the API router with all routes. CORS headers (and the preflight
/// answer) come from the layer, so they are attached to every response,
/// success or error.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        .route(
            "/v1/chat/completions",
            post(handlers::chat::handle_chat_completion).fallback(handle_not_found),
        )
        .route(
            "/v1/models",
            get(handlers::models::handle_list_models).fallback(handle_not_found),
        )
        .route(
            "/health",
            get(handlers::health::handle_health).fallback(handle_not_found),
        )
        .fallback(handle_not_found)
        .layer(cors)
        .with_state(state)
}

/// Unrouted requests. A bare `OPTIONS` (real preflights never get past the
/// CORS layer) is answered with an empty 204; everything else — unknown
/// paths and method mismatches alike, never a 405 — gets the fixed 404 body.
async fn handle_not_found(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(%origin, "invalid CORS origin, falling back to wildcard");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Run the HTTP server until the process is stopped.
pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
