//! Template catalog: parametric CAD templates on disk.
//!
//! ```text
//! <templates_dir>/
//!   keychain_roundrect/
//!     schema.json    declares params, text box, max lines, scad_file
//!     model.scad
//! ```
//! A directory without `schema.json` is not a template.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

pub mod expr;
pub mod handlers;
pub mod schema;

pub use schema::{ParamSet, TemplateSchema};

const SCHEMA_FILE: &str = "schema.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid template id '{0}'")]
    InvalidId(String),

    #[error("Missing schema: {}", .0.display())]
    MissingSchema(PathBuf),

    #[error("Missing scad: {}", .0.display())]
    MissingScad(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed schema {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A loaded template: its schema plus the resolved CAD source path.
#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub schema: TemplateSchema,
    pub scad_path: PathBuf,
}

/// Read-only view over the templates directory. Re-reads the disk on every call so
/// edited templates are picked up without a restart.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sorted ids of every sub-directory holding a `schema.json`.
    /// A missing templates directory is an empty catalog.
    pub fn list_templates(&self) -> Result<Vec<String>, CatalogError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CatalogError::Read {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(SCHEMA_FILE).is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Loads one template. Fails if the schema or the CAD source it names is absent.
    pub fn load_template(&self, id: &str) -> Result<Template, CatalogError> {
        validate_id(id)?;
        let dir = self.root.join(id);
        let schema_path = dir.join(SCHEMA_FILE);
        if !schema_path.is_file() {
            return Err(CatalogError::MissingSchema(schema_path));
        }

        let raw = std::fs::read_to_string(&schema_path).map_err(|source| CatalogError::Read {
            path: schema_path.clone(),
            source,
        })?;
        let schema: TemplateSchema =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: schema_path.clone(),
                source,
            })?;

        let scad_path = dir.join(&schema.scad_file);
        if !scad_path.is_file() {
            return Err(CatalogError::MissingScad(scad_path));
        }

        debug!(template = id, params = schema.params.len(), "Loaded template");
        Ok(Template {
            id: id.to_string(),
            schema,
            scad_path,
        })
    }

    /// Every listed template's schema keyed by id, in id order.
    pub fn load_all(&self) -> Result<IndexMap<String, TemplateSchema>, CatalogError> {
        self.list_templates()?
            .into_iter()
            .map(|id| {
                let template = self.load_template(&id)?;
                Ok((id, template.schema))
            })
            .collect()
    }
}

/// Template ids are plain directory names.
fn validate_id(id: &str) -> Result<(), CatalogError> {
    let bad = id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\'])
        || id.contains("..");
    if bad {
        return Err(CatalogError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;

    /// Writes a template directory with the given schema JSON and an empty scad file.
    pub(crate) fn write_template(root: &Path, id: &str, schema: &str) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SCHEMA_FILE), schema).unwrap();
        fs::write(dir.join("model.scad"), "cube(10);\n").unwrap();
    }

    #[test]
    fn test_list_templates_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        write_template(tmp.path(), "nameplate", r#"{"scad_file": "model.scad"}"#);
        write_template(tmp.path(), "coaster_round", r#"{"scad_file": "model.scad"}"#);
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("README.md"), "x").unwrap();

        let catalog = Catalog::new(tmp.path());
        assert_eq!(
            catalog.list_templates().unwrap(),
            vec!["coaster_round", "nameplate"]
        );
    }

    #[test]
    fn test_missing_root_is_empty_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(tmp.path().join("nope"));
        assert!(catalog.list_templates().unwrap().is_empty());
        assert!(catalog.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_load_template_resolves_scad_path() {
        let tmp = tempfile::tempdir().unwrap();
        write_template(
            tmp.path(),
            "keychain",
            r#"{"label": "Keychain", "scad_file": "model.scad", "params": {}}"#,
        );
        let template = Catalog::new(tmp.path()).load_template("keychain").unwrap();
        assert_eq!(template.id, "keychain");
        assert_eq!(template.schema.label.as_deref(), Some("Keychain"));
        assert_eq!(template.scad_path, tmp.path().join("keychain").join("model.scad"));
    }

    #[test]
    fn test_load_template_missing_schema() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("empty")).unwrap();
        let err = Catalog::new(tmp.path()).load_template("empty").unwrap_err();
        assert!(matches!(err, CatalogError::MissingSchema(_)));
        assert!(err.to_string().starts_with("Missing schema:"));
    }

    #[test]
    fn test_load_template_missing_scad() {
        let tmp = tempfile::tempdir().unwrap();
        write_template(tmp.path(), "broken", r#"{"scad_file": "other.scad"}"#);
        let err = Catalog::new(tmp.path()).load_template("broken").unwrap_err();
        assert!(matches!(err, CatalogError::MissingScad(_)));
    }

    #[test]
    fn test_load_template_malformed_json() {
        let tmp = tempfile::tempdir().unwrap();
        write_template(tmp.path(), "bad", "{not json");
        let err = Catalog::new(tmp.path()).load_template("bad").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let catalog = Catalog::new("templates");
        for id in ["", "../etc", "a/b", "a\\b", ".hidden"] {
            assert!(
                matches!(catalog.load_template(id), Err(CatalogError::InvalidId(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_load_all_keeps_id_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_template(tmp.path(), "b", r#"{"scad_file": "model.scad"}"#);
        write_template(tmp.path(), "a", r#"{"scad_file": "model.scad"}"#);
        let all = Catalog::new(tmp.path()).load_all().unwrap();
        let ids: Vec<&str> = all.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
