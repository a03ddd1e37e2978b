mod build;
mod catalog;
mod config;
mod errors;
mod intent;
mod layout;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::intent::{IntentRouter, LlmIntentRouter, OfflineIntentRouter};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PrintForge API v{}", env!("CARGO_PKG_VERSION"));

    // Template catalog
    let catalog = Catalog::new(config.templates_dir.clone());
    match catalog.list_templates() {
        Ok(ids) if ids.is_empty() => warn!(
            "No templates found in {}; add <id>/schema.json and its CAD source",
            catalog.root().display()
        ),
        Ok(ids) => info!("Template catalog: {} templates ({})", ids.len(), ids.join(", ")),
        Err(e) => warn!("Template catalog unreadable: {e}"),
    }

    // Intent router (LLM-backed when an API key is configured)
    let intent_router: Arc<dyn IntentRouter> = match &config.openai_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone())?;
            info!("LLM intent router initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmIntentRouter::new(llm))
        }
        None => {
            info!("OPENAI_API_KEY not set; intent routing runs offline");
            Arc::new(OfflineIntentRouter)
        }
    };

    info!(
        "CAD compiler: {} | output dir: {} | text margin: {}",
        config.openscad_bin,
        config.output_dir.display(),
        config.text_margin
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        catalog,
        intent_router,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
