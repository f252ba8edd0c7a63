use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vibe_proxy::{run_server, AppState, ClaudeCliRunner, ProxyConfig, SessionManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ProxyConfig::parse();

    let runner = Arc::new(ClaudeCliRunner::new(
        &config.claude_bin,
        config.timeout_ms,
        config.skip_permissions,
    ));
    let sessions = SessionManager::new(config.max_concurrent);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        %addr,
        bin = %config.claude_bin,
        models = %config.models_list(),
        "starting vibe-proxy"
    );

    let state = AppState {
        runner,
        config,
        sessions,
    };

    run_server(state, addr).await
}
