//! CAD compiler invocation. Every parameter is passed as a `-D name=value`
//! definition on the command line; the compiler writes the mesh itself.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::catalog::ParamSet;

#[derive(Debug, Error)]
pub enum CadError {
    #[error("Failed to start CAD compiler '{exe}': {source}")]
    Spawn {
        exe: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CAD compiler failed (code {})", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Failed { code: Option<i32>, logs: String },

    #[error("Failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders one `-D` definition, or `None` for null values which the compiler
/// should leave at the source default.
pub fn define_arg(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
            Some(format!("{name}=\"{escaped}\""))
        }
        other => Some(format!("{name}={other}")),
    }
}

/// Full argument list: `-o <out> -D k=v ... <scad>`.
pub fn build_args(scad_path: &Path, out_stl: &Path, params: &ParamSet) -> Vec<String> {
    let mut args = vec!["-o".to_string(), out_stl.display().to_string()];
    for (name, value) in params {
        if let Some(define) = define_arg(name, value) {
            args.push("-D".to_string());
            args.push(define);
        }
    }
    args.push(scad_path.display().to_string());
    args
}

/// Runs the CAD compiler and returns its combined stdout and stderr.
pub async fn run_openscad(
    exe: &str,
    scad_path: &Path,
    out_stl: &Path,
    params: &ParamSet,
) -> Result<String, CadError> {
    let scad_path = absolute(scad_path)?;
    let out_stl = absolute(out_stl)?;
    if let Some(parent) = out_stl.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let args = build_args(&scad_path, &out_stl, params);
    debug!(exe, ?args, "Invoking CAD compiler");

    let output = Command::new(exe)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| CadError::Spawn {
            exe: exe.to_string(),
            source,
        })?;

    let logs = combine_logs(&output.stdout, &output.stderr);
    if !output.status.success() {
        warn!(code = ?output.status.code(), "CAD compiler exited with failure");
        return Err(CadError::Failed {
            code: output.status.code(),
            logs,
        });
    }

    info!(out = %out_stl.display(), "CAD compile finished");
    Ok(logs)
}

fn combine_logs(stdout: &[u8], stderr: &[u8]) -> String {
    let mut logs = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        logs.push('\n');
        logs.push_str(&String::from_utf8_lossy(stderr));
    }
    logs
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
