pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::build::handlers as build;
use crate::catalog::handlers as catalog;
use crate::intent::handlers as intent;
use crate::layout::handlers as layout;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Template catalog
        .route("/api/v1/templates", get(catalog::handle_list_templates))
        .route("/api/v1/templates/:id", get(catalog::handle_get_template))
        .route(
            "/api/v1/templates/:id/resolve",
            post(catalog::handle_resolve),
        )
        // Layout engine
        .route("/api/v1/layout", post(layout::handle_layout))
        // Intent routing
        .route("/api/v1/intent", post(intent::handle_intent))
        // Builds
        .route(
            "/api/v1/builds",
            get(build::handle_list_builds).post(build::handle_create_build),
        )
        .route("/api/v1/builds/:job/:file", get(build::handle_download))
        .with_state(state)
}
