//! HTTP error handling and response mapping.
//!
//! Every error surfaces as `{"error": "<message>"}` with the matching
//! status code, so clients see one body shape on every failure path.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Body was not valid JSON.
    #[error("{0}")]
    InvalidJson(String),

    #[error("Invalid model: {got}. Valid models: {allowed}")]
    InvalidModel { got: String, allowed: String },

    #[error("messages must be a non-empty array")]
    EmptyMessages,

    #[error("No user message found")]
    NoUserMessage,

    #[error("Request body too large")]
    BodyTooLarge,

    /// Body read failed before the ceiling was reached.
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// Subprocess hit the wall-clock timeout (non-streaming mode).
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Subprocess failed with no usable output; message is pre-classified.
    #[error("{0}")]
    Process(String),

    #[error("Server at capacity, try again later")]
    AtCapacity,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::InvalidJson(_)
            | ProxyError::InvalidModel { .. }
            | ProxyError::EmptyMessages
            | ProxyError::NoUserMessage
            | ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ProxyError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Process(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::AtCapacity => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
