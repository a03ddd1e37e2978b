//! Intent routing: turns a free-text description into a template and parameter proposal.
//!
//! Default: `LlmIntentRouter` when an API key is configured, otherwise
//! `OfflineIntentRouter`. `AppState` holds an `Arc<dyn IntentRouter>`.
//!
//! Whatever the model answers, the proposal is rebuilt from the catalog: the
//! template id must exist (else the first template is used) and every parameter
//! goes through `sanitize_params`. Routing never fails because of the model.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::catalog::schema::{sanitize_params, ParamSet};
use crate::catalog::TemplateSchema;
use crate::errors::AppError;
use crate::llm_client::{strip_json_fences, LlmClient};

pub mod handlers;
pub mod prompts;

pub const NOTE_EMPTY_DESCRIPTION: &str = "Add a description to generate a proposal.";
pub const NOTE_MODEL_UNAVAILABLE: &str =
    "The language model could not be reached; showing defaults for the first template.";
pub const NOTE_OFFLINE: &str =
    "Intent routing is offline; set OPENAI_API_KEY to enable proposals.";

/// A proposed template and sanitized parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentProposal {
    pub template_id: String,
    pub params: ParamSet,
    pub notes: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait IntentRouter: Send + Sync {
    async fn route(
        &self,
        description: &str,
        templates: &IndexMap<String, TemplateSchema>,
    ) -> Result<IntentProposal, AppError>;

    /// Backend name reported to callers ("llm" | "offline").
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmIntentRouter
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmIntentRouter {
    llm: LlmClient,
}

impl LlmIntentRouter {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IntentRouter for LlmIntentRouter {
    async fn route(
        &self,
        description: &str,
        templates: &IndexMap<String, TemplateSchema>,
    ) -> Result<IntentProposal, AppError> {
        let description = description.trim();
        if description.is_empty() {
            return first_template_proposal(templates, NOTE_EMPTY_DESCRIPTION);
        }
        // Fail before spending a model call when there is nothing to choose from.
        first_template(templates)?;

        let prompt = prompts::build_intent_prompt(description, templates);
        let text = match self
            .llm
            .call_text(&prompt, &prompts::intent_system_prompt())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Intent routing fell back to defaults: {e}");
                return first_template_proposal(templates, NOTE_MODEL_UNAVAILABLE);
            }
        };

        let data = parse_json_loose(&text);
        debug!(raw_len = text.len(), "Parsed intent response");
        proposal_from_response(&data, templates)
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OfflineIntentRouter
// ────────────────────────────────────────────────────────────────────────────

/// Always proposes the first template with its defaults.
pub struct OfflineIntentRouter;

#[async_trait]
impl IntentRouter for OfflineIntentRouter {
    async fn route(
        &self,
        description: &str,
        templates: &IndexMap<String, TemplateSchema>,
    ) -> Result<IntentProposal, AppError> {
        let note = if description.trim().is_empty() {
            NOTE_EMPTY_DESCRIPTION
        } else {
            NOTE_OFFLINE
        };
        first_template_proposal(templates, note)
    }

    fn backend(&self) -> &'static str {
        "offline"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ────────────────────────────────────────────────────────────────────────────

fn first_template(
    templates: &IndexMap<String, TemplateSchema>,
) -> Result<(&String, &TemplateSchema), AppError> {
    templates.first().ok_or_else(|| {
        AppError::NotFound(
            "No templates found. Add templates/<id>/schema.json and its CAD source".to_string(),
        )
    })
}

fn first_template_proposal(
    templates: &IndexMap<String, TemplateSchema>,
    notes: &str,
) -> Result<IntentProposal, AppError> {
    let (id, schema) = first_template(templates)?;
    Ok(IntentProposal {
        template_id: id.clone(),
        params: sanitize_params(schema, &Map::new()),
        notes: notes.to_string(),
    })
}

/// Parses model output as a JSON object. Tolerates code fences and prose around
/// the object; anything unusable becomes an empty object.
pub fn parse_json_loose(text: &str) -> Value {
    let empty = || Value::Object(Map::new());
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(strip_json_fences(text)) {
        return value;
    }
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return empty();
    };
    if end <= start {
        return empty();
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => value,
        _ => empty(),
    }
}

/// Rebuilds a proposal from parsed model output against the catalog.
pub fn proposal_from_response(
    data: &Value,
    templates: &IndexMap<String, TemplateSchema>,
) -> Result<IntentProposal, AppError> {
    let proposed = data.get("template_id").and_then(Value::as_str);
    let (template_id, schema) = match proposed.and_then(|id| templates.get_key_value(id)) {
        Some(found) => found,
        None => {
            if let Some(id) = proposed {
                warn!(template = id, "Model proposed an unknown template; using the first");
            }
            first_template(templates)?
        }
    };

    let empty = Map::new();
    let provided = data
        .get("params")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let notes = match data.get("notes") {
        Some(Value::String(s)) => s.trim().to_string(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };

    Ok(IntentProposal {
        template_id: template_id.clone(),
        params: sanitize_params(schema, provided),
        notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn templates() -> IndexMap<String, TemplateSchema> {
        let mut map = IndexMap::new();
        map.insert(
            "coaster_round".to_string(),
            serde_json::from_value(json!({
                "scad_file": "model.scad",
                "params": {
                    "text": {"type": "string", "default": "HOME"},
                    "diameter": {"type": "number", "default": 90, "min": 60, "max": 120}
                }
            }))
            .unwrap(),
        );
        map.insert(
            "keychain_roundrect".to_string(),
            serde_json::from_value(json!({
                "label": "Keychain",
                "scad_file": "model.scad",
                "params": {
                    "text": {"type": "string", "default": "NAME"},
                    "holes": {"type": "int", "default": 1, "min": 0, "max": 2}
                }
            }))
            .unwrap(),
        );
        map
    }

    #[test]
    fn test_parse_json_loose_variants() {
        assert_eq!(parse_json_loose(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(parse_json_loose("```json\n{\"a\": 1}\n```"), json!({"a": 1}));
        assert_eq!(
            parse_json_loose("Sure! Here it is: {\"a\": {\"b\": 2}} Hope that helps."),
            json!({"a": {"b": 2}})
        );
        assert_eq!(parse_json_loose("no json here"), json!({}));
        assert_eq!(parse_json_loose("} backwards {"), json!({}));
        assert_eq!(parse_json_loose("[1, 2]"), json!({}));
    }

    #[test]
    fn test_proposal_sanitizes_params() {
        let data = json!({
            "template_id": "keychain_roundrect",
            "params": {"text": "ADA", "holes": 9, "color": "red"},
            "notes": "  Two holes max.  "
        });
        let proposal = proposal_from_response(&data, &templates()).unwrap();
        assert_eq!(proposal.template_id, "keychain_roundrect");
        assert_eq!(proposal.params["text"], json!("ADA"));
        assert_eq!(proposal.params["holes"], json!(2));
        assert!(!proposal.params.contains_key("color"));
        assert_eq!(proposal.notes, "Two holes max.");
    }

    #[test]
    fn test_unknown_template_falls_back_to_first() {
        let data = json!({"template_id": "spaceship", "params": {"text": "X"}});
        let proposal = proposal_from_response(&data, &templates()).unwrap();
        assert_eq!(proposal.template_id, "coaster_round");
        assert_eq!(proposal.params["text"], json!("X"));
        assert_eq!(proposal.params["diameter"], json!(90));
        assert_eq!(proposal.notes, "");
    }

    #[test]
    fn test_unparsable_response_gives_first_template_defaults() {
        let proposal = proposal_from_response(&parse_json_loose("???"), &templates()).unwrap();
        assert_eq!(proposal.template_id, "coaster_round");
        assert_eq!(proposal.params["text"], json!("HOME"));
    }

    #[tokio::test]
    async fn test_offline_router_notes() {
        let router = OfflineIntentRouter;
        let empty = router.route("   ", &templates()).await.unwrap();
        assert_eq!(empty.notes, NOTE_EMPTY_DESCRIPTION);
        let described = router.route("a coaster", &templates()).await.unwrap();
        assert_eq!(described.template_id, "coaster_round");
        assert_eq!(described.notes, NOTE_OFFLINE);
        assert_eq!(router.backend(), "offline");
    }

    #[tokio::test]
    async fn test_llm_router_skips_model_for_empty_description() {
        let router = LlmIntentRouter::new(LlmClient::new("test-key".to_string()).unwrap());
        let proposal = router.route("", &templates()).await.unwrap();
        assert_eq!(proposal.template_id, "coaster_round");
        assert_eq!(proposal.notes, NOTE_EMPTY_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_found() {
        let err = OfflineIntentRouter
            .route("anything", &IndexMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
