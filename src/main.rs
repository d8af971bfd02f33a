mod config;
mod error;
mod gemini;
mod models;
mod normalizer;
mod pipeline;
mod routes;

use anyhow::Context;
use routes::{router, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use std::sync::Arc;

use crate::{config::Config, gemini::GeminiClient, normalizer::ImageNormalizer, pipeline::PhotoshootPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("invalid configuration")?;
    let api_key = &config.gemini.api_key;
    tracing::info!("Using API key: {}...", api_key.chars().take(4).collect::<String>());
    tracing::info!(model = %config.gemini.model, timeout = ?config.gemini.timeout, "Gemini client configured");

    let normalizer = ImageNormalizer::new(&config.fetch).context("building fetch client")?;
    let gemini = GeminiClient::new(&config.gemini).context("building Gemini client")?;
    let state = AppState {
        pipeline: Arc::new(PhotoshootPipeline::new(normalizer, gemini)),
    };

    let app = router(state, config.max_upload_bytes);

    let addr = SocketAddr::from(([0,0,0,0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async { tokio::signal::ctrl_c().await.ok(); })
        .await
        .context("server error")?;
    Ok(())
}
