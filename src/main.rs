mod config;
mod error;
mod llm;
mod rate_limit;
mod replicate;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::llm::LlmChat;
use crate::services::images::ImageService;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = config::ServerConfig::from_env();

    // Initialize LLM client (non-fatal: edits fail with a classifier error if config missing).
    let llm: Option<Arc<dyn LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; classification disabled");
            None
        }
    };

    let images: Option<Arc<dyn ImageService>> = match replicate::ReplicateClient::from_env() {
        Ok(client) => {
            tracing::info!(api_base = %client.config().api_base, "Replicate client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Replicate client not configured; remove_bg and generate disabled");
            None
        }
    };

    let state = state::AppState::new(llm, images);
    let limits = state.rate_limiter.config();
    tracing::info!(limit = limits.limit, window_secs = limits.window.as_secs(), "rate limiter configured");

    // Drop idle client windows in the background.
    let _sweeper = state.rate_limiter.spawn_sweeper();

    let app = routes::app(state, server.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", server.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = server.port, "snapedit listening");
    axum::serve(listener, app).await.expect("server failed");
}
