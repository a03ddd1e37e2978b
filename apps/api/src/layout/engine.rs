//! Automatic text layout for a fixed physical text box.
//!
//! Given free text (or pre-split lines), a line ceiling, a box in millimetres and a
//! font-size range, picks the line count, line breaks, uniform text size and
//! inter-line gap so the whole block fits. Larger sizes win over smaller ones and,
//! at equal size, fewer lines win over more. When nothing fits even at the minimum
//! size, the last line is truncated with an ellipsis instead of failing.
//!
//! # Search
//! - sizes from `max_text_size` down in 0.5 steps, always ending exactly on
//!   `min_text_size`
//! - for each size, line counts `1..=max_lines`
//! - first `(size, count)` whose lines fit the width and whose block fits the height
//!   wins
//!
//! Pure and deterministic: no I/O, no shared state.

use serde::{Deserialize, Serialize};

use crate::layout::glyph_widths::CharWidthTable;
use crate::layout::wrap::wrap;

/// Downward stride of the size search.
pub const SIZE_STEP: f64 = 0.5;
/// Fraction of the box used when the caller does not say otherwise.
pub const DEFAULT_MARGIN: f64 = 0.9;
/// Glyph appended to truncated lines.
pub const ELLIPSIS: &str = "…";

pub const WARN_GAP_REDUCED: &str = "Line gap reduced to fit the text box.";
pub const WARN_TRUNCATED: &str = "Text truncated to fit the text box.";
pub const WARN_TRUNCATED_GAP_REDUCED: &str = "Text truncated; line gap reduced to fit the text box.";

// ────────────────────────────────────────────────────────────────────────────
// Request / result types
// ────────────────────────────────────────────────────────────────────────────

/// Text handed to the engine: either one free-text string or candidate lines.
///
/// Candidate lines are only a hint. They are joined with single spaces and the
/// engine derives its own line breaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    Text(String),
    Lines(Vec<String>),
}

impl TextInput {
    /// The single logical string the engine wraps. Blank candidate lines are dropped.
    pub fn normalized(&self) -> String {
        match self {
            TextInput::Text(text) => text.trim().to_string(),
            TextInput::Lines(lines) => lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<&str> for TextInput {
    fn from(text: &str) -> Self {
        TextInput::Text(text.to_string())
    }
}

impl From<Vec<String>> for TextInput {
    fn from(lines: Vec<String>) -> Self {
        TextInput::Lines(lines)
    }
}

fn default_margin() -> f64 {
    DEFAULT_MARGIN
}

/// One layout call. Box dimensions and gap are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRequest {
    pub input: TextInput,
    pub max_lines: u32,
    pub box_width: f64,
    pub box_height: f64,
    pub max_text_size: f64,
    pub min_text_size: f64,
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default)]
    pub line_gap: f64,
}

/// Outcome of a layout call.
///
/// `lines`, `offsets_y` and `line_widths` always have the same length, between 1
/// and the requested line ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub lines: Vec<String>,
    pub text_size: f64,
    /// Vertical centre of each line relative to the box centre, first line on top.
    pub offsets_y: Vec<f64>,
    /// Gap actually used; never larger than the requested one.
    pub line_gap: f64,
    pub line_widths: Vec<f64>,
    /// The last line was shortened and ends with an ellipsis.
    pub truncated: bool,
    /// Empty unless the layout had to degrade.
    pub warning: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Normalized inputs
// ────────────────────────────────────────────────────────────────────────────

struct Bounds {
    max_lines: usize,
    box_w_eff: f64,
    box_h_eff: f64,
    max_size: f64,
    min_size: f64,
    line_gap: f64,
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl Bounds {
    fn from_request(request: &LayoutRequest) -> Self {
        let margin = if request.margin.is_finite() && request.margin > 0.0 {
            request.margin.min(1.0)
        } else {
            DEFAULT_MARGIN
        };
        let mut max_size = finite_or_zero(request.max_text_size);
        let mut min_size = finite_or_zero(request.min_text_size);
        if max_size < min_size {
            std::mem::swap(&mut max_size, &mut min_size);
        }
        Self {
            max_lines: request.max_lines.max(1) as usize,
            box_w_eff: non_negative(request.box_width) * margin,
            box_h_eff: non_negative(request.box_height) * margin,
            max_size,
            min_size,
            line_gap: non_negative(request.line_gap),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry points
// ────────────────────────────────────────────────────────────────────────────

/// Lays out `request` with the default width buckets.
pub fn layout_text(request: &LayoutRequest) -> LayoutResult {
    layout_text_with(request, &CharWidthTable::default())
}

/// Lays out `request` measuring text with `table`. Never fails.
pub fn layout_text_with(request: &LayoutRequest, table: &CharWidthTable) -> LayoutResult {
    let bounds = Bounds::from_request(request);
    let text = request.input.normalized();

    if text.is_empty() {
        return LayoutResult {
            lines: vec![String::new()],
            text_size: bounds.max_size,
            offsets_y: vec![0.0],
            line_gap: 0.0,
            line_widths: vec![0.0],
            truncated: false,
            warning: String::new(),
        };
    }

    for text_size in candidate_sizes(bounds.max_size, bounds.min_size) {
        for count in 1..=bounds.max_lines {
            if count == 1 && text_size > bounds.box_h_eff {
                continue;
            }
            // Height is cheap to check; only stackable counts pay for a wrap.
            let Some(gap) = gap_for_height(text_size, count, bounds.box_h_eff, bounds.line_gap)
            else {
                continue;
            };
            let lines = wrap(&text, count, table);
            let widths: Vec<f64> = lines
                .iter()
                .map(|l| table.line_width(l, text_size))
                .collect();
            if widths.iter().any(|&w| w > bounds.box_w_eff) {
                continue;
            }
            let warning = if count > 1 && gap < bounds.line_gap {
                WARN_GAP_REDUCED.to_string()
            } else {
                String::new()
            };
            return LayoutResult {
                offsets_y: compute_offsets(count, gap),
                lines,
                text_size,
                line_gap: gap,
                line_widths: widths,
                truncated: false,
                warning,
            };
        }
    }

    truncated_fallback(&text, &bounds, table)
}

/// Best-effort layout when no size in range fits: `max_lines` lines at the smallest
/// usable size with the last line cut down to the box width.
fn truncated_fallback(text: &str, bounds: &Bounds, table: &CharWidthTable) -> LayoutResult {
    let text_size = bounds.min_size.min(bounds.box_h_eff).max(0.0);
    let mut lines = wrap(text, bounds.max_lines, table);
    let count = lines.len();
    let gap = gap_for_height(text_size, count, bounds.box_h_eff, bounds.line_gap).unwrap_or(0.0);

    if let Some(last) = lines.last_mut() {
        *last = truncate_line(last, text_size, bounds.box_w_eff, table);
    }
    let line_widths = lines
        .iter()
        .map(|l| table.line_width(l, text_size))
        .collect();

    let warning = if count > 1 && gap < bounds.line_gap {
        WARN_TRUNCATED_GAP_REDUCED
    } else {
        WARN_TRUNCATED
    };

    LayoutResult {
        offsets_y: compute_offsets(count, gap),
        lines,
        text_size,
        line_gap: gap,
        line_widths,
        truncated: true,
        warning: warning.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Search helpers
// ────────────────────────────────────────────────────────────────────────────

/// Sizes tried by the search, largest first, ending exactly on `min_size`.
pub fn candidate_sizes(max_size: f64, min_size: f64) -> Vec<f64> {
    let mut sizes = Vec::new();
    let mut step = 0u64;
    loop {
        let size = max_size - step as f64 * SIZE_STEP;
        if size <= min_size + 1e-9 {
            break;
        }
        sizes.push(size);
        step += 1;
    }
    sizes.push(min_size);
    sizes
}

/// Gap to use between `count` lines of `text_size` inside `box_h_eff`.
///
/// `None` when the lines cannot be stacked at all (even with zero gap). Otherwise
/// the requested gap, shrunk if the block would overflow.
pub fn gap_for_height(text_size: f64, count: usize, box_h_eff: f64, requested: f64) -> Option<f64> {
    if count <= 1 {
        return Some(0.0);
    }
    let max_gap = (box_h_eff - text_size) / (count - 1) as f64;
    if max_gap < 0.0 {
        return None;
    }
    Some(requested.min(max_gap))
}

/// Centre offsets for `count` lines stacked `gap` apart, symmetric around zero.
pub fn compute_offsets(count: usize, gap: f64) -> Vec<f64> {
    if count <= 1 {
        return vec![0.0];
    }
    let mid = (count - 1) as f64 / 2.0;
    (0..count).map(|i| (mid - i as f64) * gap).collect()
}

/// Shortens `line` until it fits `max_width` at `text_size`, appending an ellipsis.
///
/// Lines that already fit are returned unchanged. Degenerate sizes or widths, and
/// budgets too small for anything but the ellipsis, yield the ellipsis alone.
pub fn truncate_line(line: &str, text_size: f64, max_width: f64, table: &CharWidthTable) -> String {
    if max_width <= 0.0 || text_size <= 0.0 {
        return ELLIPSIS.to_string();
    }
    let max_units = max_width / text_size;
    if table.units(line) <= max_units {
        return line.to_string();
    }
    let allowed = max_units - table.units(ELLIPSIS);
    if allowed <= 0.0 {
        return ELLIPSIS.to_string();
    }

    let mut out = String::new();
    let mut acc = 0.0;
    for ch in line.chars() {
        let u = table.char_factor(ch);
        if acc + u > allowed {
            break;
        }
        out.push(ch);
        acc += u;
    }
    out.push_str(ELLIPSIS);
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
