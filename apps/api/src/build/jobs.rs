//! Build job directories under the output root.
//!
//! ```text
//! <output_dir>/<job>/
//!   spec.json               {template_id, params} as sent to the compiler
//!   emblem.svg              only when an emblem was uploaded
//!   model_<unix millis>.stl
//!   logs.txt                compiler output, written on failure too
//!   report.json             mesh validation report
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Default job name: `<template_id>_<8 hex chars>`.
pub fn default_job_name(template_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", template_id, &suffix[..8])
}

/// Job names become directory names, so they are limited to `[A-Za-z0-9_-]`.
pub fn is_valid_job_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Paths of one job's files. Creating it creates the directory.
#[derive(Debug, Clone)]
pub struct JobDir {
    pub name: String,
    pub dir: PathBuf,
}

impl JobDir {
    pub async fn create(output_dir: &Path, name: &str) -> std::io::Result<Self> {
        let dir = output_dir.join(name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    pub fn spec_path(&self) -> PathBuf {
        self.dir.join("spec.json")
    }

    pub fn emblem_path(&self) -> PathBuf {
        self.dir.join("emblem.svg")
    }

    pub fn logs_path(&self) -> PathBuf {
        self.dir.join("logs.txt")
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join("report.json")
    }

    /// Fresh mesh path; the timestamp keeps rebuilds of the same job side by side.
    pub fn new_stl_path(&self) -> PathBuf {
        self.dir
            .join(format!("model_{}.stl", Utc::now().timestamp_millis()))
    }

    pub async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        let body = serde_json::to_string_pretty(value)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Listing
// ────────────────────────────────────────────────────────────────────────────

/// A produced mesh under the output root.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEntry {
    pub job: String,
    pub file: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
    /// `job/file (YYYY-mm-dd HH:MM:SS)` in local time.
    pub label: String,
}

/// Every `.stl` below `output_dir`, newest first. A missing root lists nothing.
pub fn list_outputs(output_dir: &Path) -> std::io::Result<Vec<OutputEntry>> {
    let mut found = Vec::new();
    collect_stl(output_dir, &mut found)?;

    let mut entries: Vec<OutputEntry> = found
        .into_iter()
        .filter_map(|(path, size_bytes, modified)| {
            let rel = path.strip_prefix(output_dir).ok()?;
            let job = rel
                .components()
                .next()?
                .as_os_str()
                .to_string_lossy()
                .into_owned();
            let file = path.file_name()?.to_string_lossy().into_owned();
            let modified: DateTime<Utc> = modified.into();
            let local: DateTime<Local> = modified.into();
            let label = format!("{job}/{file} ({})", local.format("%Y-%m-%d %H:%M:%S"));
            Some(OutputEntry {
                job,
                file,
                size_bytes,
                modified,
                label,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(entries)
}

fn collect_stl(dir: &Path, out: &mut Vec<(PathBuf, u64, SystemTime)>) -> std::io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let meta = entry.metadata()?;
        if meta.is_dir() {
            collect_stl(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("stl")) {
            out.push((path, meta.len(), meta.modified()?));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_job_name_shape() {
        let name = default_job_name("keychain");
        let (prefix, suffix) = name.rsplit_once('_').unwrap();
        assert_eq!(prefix, "keychain");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(is_valid_job_name(&name));
    }

    #[test]
    fn test_job_name_validation() {
        assert!(is_valid_job_name("nameplate_01-final"));
        assert!(!is_valid_job_name(""));
        assert!(!is_valid_job_name("../etc"));
        assert!(!is_valid_job_name("a b"));
        assert!(!is_valid_job_name("a/b"));
    }

    #[tokio::test]
    async fn test_job_dir_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let job = JobDir::create(tmp.path(), "demo").await.unwrap();
        assert!(job.dir.is_dir());
        assert_eq!(job.spec_path(), tmp.path().join("demo/spec.json"));
        let stl = job.new_stl_path();
        let name = stl.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("model_") && name.ends_with(".stl"));

        job.write_json(&job.report_path(), &serde_json::json!({"ok": true}))
            .await
            .unwrap();
        let written = std::fs::read_to_string(job.report_path()).unwrap();
        assert!(written.contains("\"ok\": true"));
    }

    #[test]
    fn test_list_outputs_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let old_dir = tmp.path().join("old_job");
        let new_dir = tmp.path().join("new_job");
        std::fs::create_dir_all(&old_dir).unwrap();
        std::fs::create_dir_all(&new_dir).unwrap();

        let old = old_dir.join("model_1.stl");
        std::fs::write(&old, b"x").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();
        std::fs::write(new_dir.join("model_2.stl"), b"yy").unwrap();
        std::fs::write(new_dir.join("logs.txt"), b"ignored").unwrap();

        let entries = list_outputs(tmp.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].job, "new_job");
        assert_eq!(entries[0].file, "model_2.stl");
        assert_eq!(entries[0].size_bytes, 2);
        assert!(entries[1].label.starts_with("old_job/model_1.stl ("));
    }

    #[test]
    fn test_list_outputs_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(list_outputs(&tmp.path().join("none")).unwrap().is_empty());
    }
}
