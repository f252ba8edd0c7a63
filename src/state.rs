//! Application state shared across handlers.

use crate::config::ProxyConfig;
use crate::runner::CompletionRunner;
use crate::session_manager::SessionManager;
use std::sync::Arc;

/// Shared, immutable per-process state. Cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    /// Completion backend (the claude CLI in production, a stub in tests).
    pub runner: Arc<dyn CompletionRunner>,
    /// Startup configuration, never mutated after parse.
    pub config: ProxyConfig,
    /// Admission control for concurrent subprocesses.
    pub sessions: Arc<SessionManager>,
}
