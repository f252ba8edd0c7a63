//! Chat completion request/response types.

use crate::models::common::ChatMessage;
use serde::{Deserialize, Serialize};

/// Chat completion request. Unknown fields (temperature, max_tokens, ...)
/// are accepted and ignored — the wrapped CLI has no use for them.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Streaming is the default; clients must opt out with `"stream": false`.
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

/// Chat completion choice (buffered mode).
#[derive(Debug, Serialize)]
pub struct ChatChoice {
    pub index: usize,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// Buffered chat completion response.
#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
}
