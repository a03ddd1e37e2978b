use indexmap::IndexMap;
use serde_json::json;

use crate::catalog::TemplateSchema;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

const ROUTER_INSTRUCTIONS: &str = "You map user descriptions to a single template and parameters. \
    Output keys: template_id, params, notes. \
    Do not invent personal data. Use only user-provided text. \
    Only include params that exist in the chosen template schema. \
    Use defaults when missing. Keep numbers within min/max.";

pub fn intent_system_prompt() -> String {
    format!("{ROUTER_INSTRUCTIONS} {JSON_ONLY_SYSTEM}")
}

/// User message: the description plus every template's id, label and parameter specs.
pub fn build_intent_prompt(description: &str, templates: &IndexMap<String, TemplateSchema>) -> String {
    let catalog: Vec<_> = templates
        .iter()
        .map(|(id, schema)| {
            json!({
                "template_id": id,
                "label": schema.label_or(id),
                "params": schema.params,
            })
        })
        .collect();

    json!({
        "description": description,
        "templates": catalog,
    })
    .to_string()
}
