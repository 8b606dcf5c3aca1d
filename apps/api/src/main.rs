mod config;
mod document;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod rewrite;
mod routes;
mod scoring;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::document::FileDecoder;
use crate::llm_client::LlmClient;
use crate::rewrite::LlmRewriter;
use crate::routes::build_router;
use crate::scoring::LlmScorer;
use crate::state::AppState;
use crate::store::TransactionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // target names use underscores, the package name a hyphen
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Architect API v{}", env!("CARGO_PKG_VERSION"));

    // Transaction store connects (and provisions its schema) on first use
    let store = Arc::new(TransactionStore::new(config.database_url.clone()));
    info!("Transaction store handle initialized (lazy connect)");

    // LLM client, shared by the scoring and rewrite services
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let state = AppState {
        store,
        scorer: Arc::new(LlmScorer(llm.clone())),
        rewriter: Arc::new(LlmRewriter(llm)),
        decoder: Arc::new(FileDecoder),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
