//! Axum route handlers for the Layout API.

use axum::Json;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::layout::engine::{layout_text, LayoutRequest, LayoutResult, SIZE_STEP};

/// Largest line ceiling a single request may ask for.
pub const MAX_LAYOUT_LINES: u32 = 8;
/// Longest text, in characters, a single request may lay out.
pub const MAX_LAYOUT_CHARS: usize = 256;
/// Most size steps a single request may search.
pub const MAX_SIZE_STEPS: f64 = 400.0;

/// Rejects requests whose search would be unbounded in practice.
///
/// Only the work a request can trigger is bounded here; otherwise degenerate values
/// (zero boxes, swapped sizes) are left for the engine to normalize.
fn check_limits(request: &LayoutRequest) -> Result<(), AppError> {
    if request.max_lines > MAX_LAYOUT_LINES {
        return Err(AppError::Validation(format!(
            "max_lines must be at most {MAX_LAYOUT_LINES}, got {}",
            request.max_lines
        )));
    }
    let chars = request.input.normalized().chars().count();
    if chars > MAX_LAYOUT_CHARS {
        return Err(AppError::Validation(format!(
            "input must be at most {MAX_LAYOUT_CHARS} characters, got {chars}"
        )));
    }
    let steps = (request.max_text_size - request.min_text_size).abs() / SIZE_STEP;
    if steps.is_nan() || steps > MAX_SIZE_STEPS {
        return Err(AppError::Validation(format!(
            "text size range {}..{} is too wide; at most {} mm",
            request.min_text_size,
            request.max_text_size,
            MAX_SIZE_STEPS * SIZE_STEP
        )));
    }
    Ok(())
}

/// POST /api/v1/layout
///
/// Runs the layout engine on a raw request. Requests beyond the search limits are
/// rejected; other degenerate input is normalized and degradation is reported
/// through `truncated` and `warning`.
pub async fn handle_layout(
    Json(request): Json<LayoutRequest>,
) -> Result<Json<LayoutResult>, AppError> {
    check_limits(&request)?;
    let result = tokio::task::spawn_blocking(move || layout_text(&request))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("layout task failed: {e}")))?;

    if result.truncated {
        warn!(lines = result.lines.len(), "Layout truncated: {}", result.warning);
    } else {
        debug!(
            text_size = result.text_size,
            lines = result.lines.len(),
            "Layout fitted"
        );
    }

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::engine::TextInput;

    fn request(text: &str) -> LayoutRequest {
        LayoutRequest {
            input: TextInput::from(text),
            max_lines: 2,
            box_width: 50.0,
            box_height: 10.0,
            max_text_size: 8.0,
            min_text_size: 4.0,
            margin: 0.9,
            line_gap: 0.0,
        }
    }

    #[tokio::test]
    async fn test_handle_layout_fits_short_text() {
        let Json(result) = handle_layout(Json(request("CAT"))).await.unwrap();
        assert_eq!(result.lines, vec!["CAT"]);
        assert_eq!(result.text_size, 8.0);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_handle_layout_reports_truncation() {
        let mut req = request("A VERY LONG LABEL THAT CANNOT FIT");
        req.box_width = 2.0;
        req.box_height = 2.0;
        let Json(result) = handle_layout(Json(req)).await.unwrap();
        assert!(result.truncated);
        assert!(!result.warning.is_empty());
    }

    #[tokio::test]
    async fn test_handle_layout_rejects_line_ceiling_over_limit() {
        let mut req = request("THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG");
        req.max_lines = 30;
        req.box_width = 1.0;
        req.box_height = 1.0;
        req.max_text_size = 40.0;
        let err = handle_layout(Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_handle_layout_rejects_huge_size_range() {
        let mut req = request("CAT");
        req.max_text_size = 1e7;
        req.min_text_size = 0.0;
        let err = handle_layout(Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_handle_layout_rejects_long_text() {
        let req = request(&"A".repeat(MAX_LAYOUT_CHARS + 1));
        let err = handle_layout(Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_handle_layout_accepts_limits_exactly() {
        let mut req = request("CAT");
        req.max_lines = MAX_LAYOUT_LINES;
        req.max_text_size = 4.0 + MAX_SIZE_STEPS * SIZE_STEP;
        let Json(result) = handle_layout(Json(req)).await.unwrap();
        assert_eq!(result.lines, vec!["CAT"]);
    }
}
