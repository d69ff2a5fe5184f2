mod answer;
mod config;
mod extract;
mod llm;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use answer::Answerer;
use config::{AppConfig, AppState};
use extract::ContentExtractor;
use llm::LlmClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load env
    let _ = dotenv::dotenv();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // Init LLM client
    let llm_client = Arc::new(LlmClient::new(
        &config.llm_base_url,
        &config.model,
        &config.api_key,
        config.llm_timeout,
    )?);
    info!(model = llm_client.model(), "LLM client initialized");

    let extractor = Arc::new(ContentExtractor::new(config.fetch_timeout)?);
    let answerer = Arc::new(Answerer::new(extractor, llm_client, &config.source_url));
    info!(source = answerer.source_url(), "Answerer ready");

    let app = routes::router(AppState { answerer });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on http://{}/api?query=...", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
