//! Startup configuration.
//!
//! Every knob is a CLI flag with an environment-variable fallback. Parsed
//! once in `main` and carried immutably inside [`AppState`](crate::AppState);
//! handlers never read the environment themselves.

use clap::Parser;

/// Proxy configuration, read once at startup.
#[derive(Parser, Debug, Clone)]
#[command(name = "vibe-proxy", version, about = "OpenAI-compatible proxy over the claude CLI")]
pub struct ProxyConfig {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Allowed CORS origin ("*" for any).
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// Wall-clock timeout for one subprocess, in milliseconds.
    #[arg(long, env = "PROXY_TIMEOUT_MS", default_value_t = 300_000)]
    pub timeout_ms: u64,

    /// Pass --dangerously-skip-permissions so the CLI never blocks on
    /// confirmation prompts (it runs headless under this proxy).
    #[arg(
        long,
        env = "SKIP_PERMISSIONS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub skip_permissions: bool,

    /// Maximum accepted request body size in bytes.
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 1_048_576)]
    pub max_body_bytes: usize,

    /// Executable to spawn for completions.
    #[arg(long, env = "CLAUDE_BIN", default_value = "claude")]
    pub claude_bin: String,

    /// Model identifiers accepted by the API (passed through as --model).
    #[arg(
        long,
        env = "PROXY_MODELS",
        value_delimiter = ',',
        default_value = "opus,sonnet,haiku"
    )]
    pub models: Vec<String>,

    /// Maximum concurrent subprocesses; further requests get 503.
    #[arg(long, env = "MAX_CONCURRENT", default_value_t = 8)]
    pub max_concurrent: usize,
}

impl ProxyConfig {
    /// The allow-list rendered for error messages: "opus, sonnet, haiku".
    pub fn models_list(&self) -> String {
        self.models.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ProxyConfig::parse_from(["vibe-proxy"]);
        assert_eq!(cfg.timeout_ms, 300_000);
        assert_eq!(cfg.max_body_bytes, 1_048_576);
        assert_eq!(cfg.models, ["opus", "sonnet", "haiku"]);
        assert!(cfg.skip_permissions);
    }

    #[test]
    fn models_from_flag() {
        let cfg = ProxyConfig::parse_from([
            "vibe-proxy",
            "--models",
            "claude-opus-4,claude-sonnet-4",
        ]);
        assert_eq!(cfg.models, ["claude-opus-4", "claude-sonnet-4"]);
        assert_eq!(cfg.models_list(), "claude-opus-4, claude-sonnet-4");
    }
}
