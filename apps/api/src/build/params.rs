//! Parameter resolution: turns user-supplied values into the exact parameter set
//! handed to the CAD compiler.
//!
//! Order matters: sanitize → text box geometry → text layout → emblem snapping.
//! Layout output is written back under the names the schema declares
//! (`text_size`, `line_gap`, `line1..N`, `line1_offset_y..N`).

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::build::emblem::EmblemSnap;
use crate::catalog::expr::eval_expr;
use crate::catalog::schema::{sanitize_params, value_as_f64, ParamSet, TemplateSchema};
use crate::layout::{layout_text, LayoutRequest, LayoutResult, TextInput};

/// Geometry and engine output behind a resolved parameter set, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutDebug {
    pub box_w: f64,
    pub box_h: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// False when the template opts out of automatic fitting and lines pass through.
    pub auto_layout: bool,
    #[serde(flatten)]
    pub result: LayoutResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedParams {
    pub params: ParamSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutDebug>,
}

pub fn resolve_params(
    template_id: &str,
    schema: &TemplateSchema,
    provided: &Map<String, Value>,
    margin: f64,
) -> ResolvedParams {
    let mut params = sanitize_params(schema, provided);
    let layout = apply_text_layout(template_id, schema, &mut params, margin);
    apply_emblem_snap(&mut params);
    ResolvedParams { params, layout }
}

fn number(params: &ParamSet, key: &str) -> Option<f64> {
    params.get(key).and_then(value_as_f64)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Keys `line1, line2, …` present in `params`, stopping at the first gap.
fn line_keys(params: &ParamSet) -> Vec<String> {
    (1..)
        .map(|i| format!("line{i}"))
        .take_while(|key| params.contains_key(key))
        .collect()
}

fn apply_text_layout(
    template_id: &str,
    schema: &TemplateSchema,
    params: &mut ParamSet,
    margin: f64,
) -> Option<LayoutDebug> {
    let text_box = schema.text_box.as_ref()?;
    if !params.contains_key("text_size") {
        return None;
    }

    let max_text_size = number(params, "text_size").unwrap_or(0.0);
    let min_text_size = schema
        .params
        .get("text_size")
        .and_then(|spec| spec.min)
        .unwrap_or(max_text_size);
    let box_w = eval_expr(&text_box.box_w, params);
    let box_h = eval_expr(&text_box.box_h, params);
    let offset_x = eval_expr(&text_box.offset_x, params);
    let offset_y = eval_expr(&text_box.offset_y, params);
    params.insert("offset_x".to_string(), Value::from(offset_x));
    params.insert("offset_y".to_string(), Value::from(offset_y));

    let keys = line_keys(params);
    let raw_lines: Vec<String> = if keys.is_empty() {
        params.get("text").map(text_of).into_iter().collect()
    } else {
        keys.iter().map(|k| text_of(&params[k.as_str()])).collect()
    };
    let line_gap = number(params, "line_gap").unwrap_or(0.0);

    if !schema.auto_layout {
        debug!(template = template_id, "Auto layout disabled; passing lines through");
        return Some(LayoutDebug {
            box_w,
            box_h,
            offset_x,
            offset_y,
            auto_layout: false,
            result: LayoutResult {
                lines: raw_lines,
                text_size: max_text_size,
                offsets_y: Vec::new(),
                line_gap,
                line_widths: Vec::new(),
                truncated: false,
                warning: String::new(),
            },
        });
    }

    // A lone `text` param holds one line; `lineN` keys hold one each.
    let slots = u32::try_from(keys.len().max(1)).unwrap_or(u32::MAX);
    let request = LayoutRequest {
        input: TextInput::Lines(raw_lines),
        max_lines: schema.max_lines.min(slots),
        box_width: box_w,
        box_height: box_h,
        max_text_size,
        min_text_size,
        margin,
        line_gap,
    };
    let result = layout_text(&request);
    if !result.warning.is_empty() {
        warn!(template = template_id, truncated = result.truncated, "{}", result.warning);
    }

    params.insert("text_size".to_string(), Value::from(result.text_size));
    if params.contains_key("line_gap") {
        params.insert("line_gap".to_string(), Value::from(result.line_gap));
    }
    if keys.is_empty() {
        if params.contains_key("text") {
            params.insert("text".to_string(), Value::from(result.lines.join(" ")));
        }
    } else {
        for (i, key) in keys.iter().enumerate() {
            let line = result.lines.get(i).cloned().unwrap_or_default();
            params.insert(key.clone(), Value::from(line));
            let offset_key = format!("{key}_offset_y");
            if params.contains_key(&offset_key) {
                let offset = result.offsets_y.get(i).copied().unwrap_or(0.0);
                params.insert(offset_key, Value::from(offset));
            }
        }
    }

    Some(LayoutDebug {
        box_w,
        box_h,
        offset_x,
        offset_y,
        auto_layout: true,
        result,
    })
}

fn apply_emblem_snap(params: &mut ParamSet) {
    let snap = match params.get("emblem_snap") {
        Some(Value::String(s)) if !s.is_empty() && s != "custom" => s.clone(),
        _ => return,
    };
    let anchor: EmblemSnap = match snap.parse() {
        Ok(anchor) => anchor,
        Err(never) => match never {},
    };

    let box_w = number(params, "text_box_w").unwrap_or(0.0);
    let box_h = number(params, "text_box_h").unwrap_or(0.0);
    let box_off_x = number(params, "text_box_offset_x").unwrap_or(0.0);
    let box_off_y = number(params, "text_box_offset_y").unwrap_or(0.0);
    let autocenter = number(params, "emblem_autocenter").map_or(true, |v| v.trunc() == 1.0);

    let (x, y) = if anchor == EmblemSnap::Center && autocenter {
        (0.0, 0.0)
    } else {
        anchor.snap_position(box_w, box_h)
    };
    params.insert("emblem_x".to_string(), Value::from(x + box_off_x));
    params.insert("emblem_y".to_string(), Value::from(y + box_off_y));
}
