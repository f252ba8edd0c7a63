//! # vibe-proxy
//!
//! OpenAI-compatible HTTP proxy that adapts the `claude` command-line tool
//! into a streaming chat-completion API.
//!
//! Each request spawns one `claude` subprocess; its stdout is forwarded as
//! Server-Sent Events (`chat.completion.chunk` frames ending in `[DONE]`)
//! or buffered into a single `chat.completion` response.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod prompt;
pub mod runner;
pub mod server;
pub mod session_manager;
pub mod state;
pub mod streaming;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use runner::{ClaudeCliRunner, CompletionRunner, RunStatus, RunnerOutcome, RunnerRequest};
pub use server::{create_router, run_server};
pub use session_manager::SessionManager;
pub use state::AppState;
