//! OpenAI-compatible request/response types.

pub mod chat;
pub mod common;
pub mod streaming;

pub use chat::{ChatChoice, ChatCompletionRequest, ChatCompletionResponse};
pub use common::ChatMessage;
pub use streaming::{ChatChoiceDelta, ChatCompletionChunk, ChatDelta};
