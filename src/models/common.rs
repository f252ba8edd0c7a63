//! Types shared between the buffered and streaming chat models.

use serde::{Deserialize, Serialize};

/// One turn of a conversation. Ordering in the request array is
/// significant — it becomes the transcript order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}
