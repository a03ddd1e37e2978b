use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::intent::IntentRouter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Catalog,
    /// Pluggable intent router. LLM-backed when OPENAI_API_KEY is set, offline otherwise.
    pub intent_router: Arc<dyn IntentRouter>,
}
