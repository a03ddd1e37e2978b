//! Axum route handlers for the Build API.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::build::jobs::{default_job_name, is_valid_job_name, list_outputs, JobDir, OutputEntry};
use crate::build::params::{resolve_params, LayoutDebug};
use crate::build::runner::{run_openscad, CadError};
use crate::build::validate::{validate_stl, MeshReport};
use crate::errors::{log_tail, AppError};
use crate::state::AppState;

/// How much compiler output a successful build echoes back.
const LOG_TAIL_CHARS: usize = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub template_id: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Defaults to `<template_id>_<8 hex chars>`.
    pub job_name: Option<String>,
    /// SVG document placed on templates that declare an `emblem_path` parameter.
    pub emblem_svg: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BuildResponse {
    pub job: String,
    pub stl_path: String,
    pub logs: String,
    pub report: MeshReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutDebug>,
}

#[derive(Debug, Serialize)]
pub struct OutputListResponse {
    pub outputs: Vec<OutputEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/builds
///
/// Resolves parameters, writes the job files, compiles the mesh and validates it.
/// Compiler failures come back as 422 with the tail of the compiler output;
/// `logs.txt` is written either way.
pub async fn handle_create_build(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> Result<Json<BuildResponse>, AppError> {
    let template = state.catalog.load_template(&request.template_id)?;

    let job_name = match request.job_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_job_name(&template.id),
    };
    if !is_valid_job_name(&job_name) {
        return Err(AppError::Validation(format!(
            "job_name '{job_name}' may only contain letters, digits, '_' and '-'"
        )));
    }

    let margin = state.config.text_margin;
    let (template, mut resolved) = tokio::task::spawn_blocking(move || {
        let resolved = resolve_params(&template.id, &template.schema, &request.params, margin);
        (template, resolved)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("parameter resolution failed: {e}")))?;

    let job = JobDir::create(&state.config.output_dir, &job_name).await?;
    info!(job = %job.name, template = %template.id, "Starting build");

    if let Some(svg) = request.emblem_svg.as_deref() {
        if template.schema.params.contains_key("emblem_path") {
            let emblem_path = job.emblem_path();
            tokio::fs::write(&emblem_path, svg).await?;
            let absolute = tokio::fs::canonicalize(&emblem_path).await?;
            resolved.params.insert("emblem_enabled".to_string(), json!(1));
            resolved.params.insert(
                "emblem_path".to_string(),
                Value::from(absolute.display().to_string()),
            );
        } else {
            warn!(template = %template.id, "Template takes no emblem; ignoring SVG");
        }
    }

    job.write_json(
        &job.spec_path(),
        &json!({"template_id": template.id, "params": resolved.params}),
    )
    .await?;

    let stl_path = job.new_stl_path();
    let logs = match run_openscad(
        &state.config.openscad_bin,
        &template.scad_path,
        &stl_path,
        &resolved.params,
    )
    .await
    {
        Ok(logs) => logs,
        Err(e) => {
            let logs = match &e {
                CadError::Failed { logs, .. } => logs.clone(),
                other => other.to_string(),
            };
            tokio::fs::write(job.logs_path(), logs).await?;
            return Err(AppError::Cad(e));
        }
    };
    tokio::fs::write(job.logs_path(), &logs).await?;

    let mesh_path = stl_path.clone();
    let report = tokio::task::spawn_blocking(move || validate_stl(&mesh_path))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("mesh validation failed: {e}")))?;
    job.write_json(&job.report_path(), &report).await?;

    if !report.ok {
        warn!(job = %job.name, error = ?report.error, "Mesh validation failed");
    }
    info!(job = %job.name, ok = report.ok, "Build finished");

    Ok(Json(BuildResponse {
        job: job.name,
        stl_path: stl_path.display().to_string(),
        logs: log_tail(&logs, LOG_TAIL_CHARS).to_string(),
        report,
        layout: resolved.layout,
    }))
}

/// GET /api/v1/builds
///
/// Every produced mesh under the output directory, newest first.
pub async fn handle_list_builds(
    State(state): State<AppState>,
) -> Result<Json<OutputListResponse>, AppError> {
    let output_dir = state.config.output_dir.clone();
    let outputs = tokio::task::spawn_blocking(move || list_outputs(&output_dir))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("output listing failed: {e}")))??;
    Ok(Json(OutputListResponse { outputs }))
}

/// GET /api/v1/builds/:job/:file
///
/// Downloads one produced mesh.
pub async fn handle_download(
    State(state): State<AppState>,
    Path((job, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    if !is_valid_job_name(&job) || !is_mesh_file_name(&file) {
        return Err(AppError::Validation(format!("Invalid output path '{job}/{file}'")));
    }

    let path = state.config.output_dir.join(&job).join(&file);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("Output '{job}/{file}' not found")))
        }
        Err(e) => return Err(AppError::Io(e)),
    };

    let headers = [
        (header::CONTENT_TYPE, "model/stl".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

fn is_mesh_file_name(file: &str) -> bool {
    !file.starts_with('.')
        && file.to_ascii_lowercase().ends_with(".stl")
        && file
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !file.contains("..")
}
