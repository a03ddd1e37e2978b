//! Template schema model and parameter coercion.
//!
//! A schema declares each CAD parameter with a type, a default and optional
//! bounds. Every value that reaches the CAD compiler, whether typed by a user or
//! proposed by the intent router, passes through `sanitize_params` first.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter name → value, in schema declaration order.
pub type ParamSet = IndexMap<String, Value>;

// ────────────────────────────────────────────────────────────────────────────
// Schema types
// ────────────────────────────────────────────────────────────────────────────

fn default_max_lines() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Contents of `<template>/schema.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// CAD source file, relative to the template directory.
    pub scad_file: String,
    #[serde(default)]
    pub params: IndexMap<String, ParamSpec>,
    /// Area available to text, as expressions over other parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_box: Option<TextBox>,
    #[serde(default = "default_max_lines")]
    pub max_lines: u32,
    /// When false the user's lines are passed through without automatic fitting.
    #[serde(default = "default_true")]
    pub auto_layout: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateSchema {
    pub fn label_or<'a>(&'a self, id: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(id)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parameter kinds understood by the coercion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Integer,
    Number,
    /// Undeclared kinds are carried as text.
    Other,
}

impl ParamSpec {
    pub fn param_type(&self) -> ParamType {
        match self.kind.as_str() {
            "string" => ParamType::Text,
            "int" | "integer" => ParamType::Integer,
            "number" => ParamType::Number,
            _ => ParamType::Other,
        }
    }

    fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

/// Text box geometry; each field is a number or an arithmetic expression string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBox {
    #[serde(default)]
    pub box_w: Value,
    #[serde(default)]
    pub box_h: Value,
    #[serde(default)]
    pub offset_x: Value,
    #[serde(default)]
    pub offset_y: Value,
}

// ────────────────────────────────────────────────────────────────────────────
// Coercion
// ────────────────────────────────────────────────────────────────────────────

/// Reads a JSON value as a float the way a form field would: numbers as-is,
/// numeric strings parsed, booleans as 0/1.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Coerces `value` to the declared kind and clamps it to the declared bounds.
/// Anything that cannot be coerced becomes the schema default.
pub fn coerce_value(value: &Value, spec: &ParamSpec) -> Value {
    if value.is_null() {
        return spec.default_value();
    }
    match spec.param_type() {
        ParamType::Integer => {
            let Some(raw) = value_as_f64(value) else {
                return spec.default_value();
            };
            let mut v = raw.trunc();
            if let Some(min) = spec.min {
                v = v.max(min.trunc());
            }
            if let Some(max) = spec.max {
                v = v.min(max.trunc());
            }
            Value::from(v as i64)
        }
        ParamType::Number => {
            let Some(mut v) = value_as_f64(value) else {
                return spec.default_value();
            };
            if let Some(min) = spec.min {
                v = v.max(min);
            }
            if let Some(max) = spec.max {
                v = v.min(max);
            }
            Value::from(v)
        }
        ParamType::Text | ParamType::Other => match value {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        },
    }
}

/// Builds a complete parameter set for `schema`: every declared key, in order,
/// coerced from `provided` when present and defaulted otherwise. Keys the schema
/// does not declare are dropped.
pub fn sanitize_params(schema: &TemplateSchema, provided: &Map<String, Value>) -> ParamSet {
    schema
        .params
        .iter()
        .map(|(key, spec)| {
            let value = match provided.get(key) {
                Some(v) => coerce_value(v, spec),
                None => spec.default_value(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// All schema defaults.
pub fn default_params(schema: &TemplateSchema) -> ParamSet {
    sanitize_params(schema, &Map::new())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
