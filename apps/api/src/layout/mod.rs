// Text layout engine: fits free text into a physical text box.
// Pure and synchronous; async callers run it inside tokio::task::spawn_blocking.

pub mod engine;
pub mod glyph_widths;
pub mod handlers;
pub mod wrap;

// Re-export the public API consumed by other modules (build pipeline, handlers).
pub use engine::{layout_text, LayoutRequest, LayoutResult, TextInput};
