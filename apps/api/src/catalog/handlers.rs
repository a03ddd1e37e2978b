//! Axum route handlers for the Template API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::build::params::{resolve_params, ResolvedParams};
use crate::catalog::schema::{default_params, ParamSet};
use crate::catalog::TemplateSchema;
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub label: String,
    pub max_lines: u32,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateSummary>,
}

#[derive(Debug, Serialize)]
pub struct TemplateDetailResponse {
    pub id: String,
    pub label: String,
    pub schema: TemplateSchema,
    pub defaults: ParamSet,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub template_id: String,
    #[serde(flatten)]
    pub resolved: ResolvedParams,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<TemplateListResponse>, AppError> {
    let templates = state
        .catalog
        .load_all()?
        .into_iter()
        .map(|(id, schema)| TemplateSummary {
            label: schema.label_or(&id).to_string(),
            max_lines: schema.max_lines,
            id,
        })
        .collect();
    Ok(Json(TemplateListResponse { templates }))
}

/// GET /api/v1/templates/:id
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> Result<Json<TemplateDetailResponse>, AppError> {
    let template = state.catalog.load_template(&template_id)?;
    Ok(Json(TemplateDetailResponse {
        label: template.schema.label_or(&template.id).to_string(),
        defaults: default_params(&template.schema),
        id: template.id,
        schema: template.schema,
    }))
}

/// POST /api/v1/templates/:id/resolve
///
/// Returns the parameter set a build would hand to the CAD compiler, with the
/// text layout behind it. Does not compile anything.
pub async fn handle_resolve(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, AppError> {
    let template = state.catalog.load_template(&template_id)?;
    let margin = state.config.text_margin;
    let resolved = tokio::task::spawn_blocking(move || {
        resolve_params(&template.id, &template.schema, &request.params, margin)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("parameter resolution failed: {e}")))?;

    Ok(Json(ResolveResponse {
        template_id,
        resolved,
    }))
}
