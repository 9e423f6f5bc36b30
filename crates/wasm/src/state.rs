//! Host-facing conversions that do not touch the DOM.

use cliffray_core::field_source::fallback_source;
use cliffray_core::{FrameState, RenderError, ViewMode};

/// Parses a provider snapshot from its JSON text.
///
/// # Errors
///
/// `RenderError::Configuration` if the JSON is malformed or a field has the
/// wrong shape.
pub fn parse_frame_state(json: &str) -> Result<FrameState, RenderError> {
    serde_json::from_str(json).map_err(|e| RenderError::Configuration(format!("frame state: {e}")))
}

/// Components of the stand-in field for `view` at `frame`.
///
/// Empty for `clifford`, which has no generator. Unknown view names fall
/// back to `clifford`.
pub fn preview_components(view: &str, frame: u64) -> Vec<f32> {
    let view = ViewMode::from_name_or_default(view);
    fallback_source(view, None)
        .map(|source| source.sample(frame).components().to_vec())
        .unwrap_or_default()
}
