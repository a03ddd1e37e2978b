//! Axum route handlers for the Intent API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::schema::ParamSet;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub template_id: String,
    pub label: String,
    pub params: ParamSet,
    pub notes: String,
    pub backend: &'static str,
}

/// POST /api/v1/intent
///
/// Proposes a template and parameters for a free-text description. The proposal
/// is only a suggestion; nothing is built.
pub async fn handle_intent(
    State(state): State<AppState>,
    Json(request): Json<IntentRequest>,
) -> Result<Json<IntentResponse>, AppError> {
    let templates = state.catalog.load_all()?;
    let proposal = state
        .intent_router
        .route(&request.description, &templates)
        .await?;

    let label = templates
        .get(&proposal.template_id)
        .map(|schema| schema.label_or(&proposal.template_id).to_string())
        .unwrap_or_else(|| proposal.template_id.clone());
    info!(
        template = %proposal.template_id,
        backend = state.intent_router.backend(),
        "Intent proposal ready"
    );

    Ok(Json(IntentResponse {
        template_id: proposal.template_id,
        label,
        params: proposal.params,
        notes: proposal.notes,
        backend: state.intent_router.backend(),
    }))
}
