//! Per-frame inputs pulled from the host's state provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::camera::CameraState;
use crate::field::MultivectorField;
use crate::graph::GraphSnapshot;
use crate::overlay::OverlayMetrics;
use crate::params::{param_f32, param_u32};
use crate::view_mode::ViewMode;

/// Default sphere-tracing step budget.
pub const DEFAULT_MAX_STEPS: u32 = 64;
/// Default audio coherence when the provider omits it.
pub const DEFAULT_AUDIO_COHERENCE: f32 = 0.5;

/// Sphere-tracing thresholds.
///
/// `min_distance` is the hit threshold and `max_distance` the ray length
/// cutoff; both are uploaded as uniforms each frame. `max_steps` is baked
/// into the shader when the pipeline is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingParameters {
    pub max_steps: u32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for RenderingParameters {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            min_distance: 0.02,
            max_distance: 500.0,
        }
    }
}

impl RenderingParameters {
    /// Reads a possibly partial config, defaulting missing or mistyped keys.
    pub fn from_params(params: &Value) -> Self {
        let d = Self::default();
        Self {
            max_steps: param_u32(params, "max_steps", d.max_steps),
            min_distance: param_f32(params, "min_distance", d.min_distance),
            max_distance: param_f32(params, "max_distance", d.max_distance),
        }
    }
}

/// One snapshot from the state provider.
///
/// Field names follow the host's camelCase JSON. A missing `cliffordField`
/// means "nothing to draw this frame"; the view name is kept as a string so
/// unknown values can fall back to `clifford` with a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameState {
    #[serde(default)]
    pub clifford_field: Option<MultivectorField>,
    #[serde(default)]
    pub camera: CameraState,
    #[serde(default)]
    pub rendering: RenderingParameters,
    #[serde(default = "default_audio_coherence")]
    pub audio_coherence: f32,
    #[serde(default)]
    pub current_graph: Option<GraphSnapshot>,
    #[serde(default)]
    pub metrics: Option<OverlayMetrics>,
    #[serde(default = "default_view")]
    pub view: String,
}

fn default_audio_coherence() -> f32 {
    DEFAULT_AUDIO_COHERENCE
}

fn default_view() -> String {
    ViewMode::Clifford.name().to_owned()
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            clifford_field: None,
            camera: CameraState::default(),
            rendering: RenderingParameters::default(),
            audio_coherence: DEFAULT_AUDIO_COHERENCE,
            current_graph: None,
            metrics: None,
            view: default_view(),
        }
    }
}

impl FrameState {
    /// The view mode, falling back to `Clifford` for unknown names.
    pub fn view_mode(&self) -> ViewMode {
        ViewMode::from_name_or_default(&self.view)
    }
}
