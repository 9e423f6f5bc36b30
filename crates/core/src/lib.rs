#![deny(unsafe_code)]
//! Core of the cliffray Clifford-field raymarcher.
//!
//! Provides the 16-component `MultivectorField` and its texture encodings,
//! camera matrices with inversion caching, the raymarch pipeline builder and
//! its GLSL, a CPU reference of the shader's distance estimator, 2D overlay
//! strategies per view mode, and the GL-facing shader runtime and frame
//! renderer. The `glow` backend is behind the `render` feature.

pub mod camera;
pub mod encoding;
pub mod error;
pub mod field;
pub mod field_source;
pub mod graph;
pub mod overlay;
pub mod params;
pub mod pipeline;
pub mod render;
pub mod sdf;
pub mod state;
pub mod trace;
pub mod view_mode;

pub use camera::{CameraMatrices, CameraState, MatrixCache};
pub use encoding::{TexelPayload, TextureEncoding};
pub use error::RenderError;
pub use field::MultivectorField;
pub use field_source::FieldSource;
pub use graph::GraphSnapshot;
pub use overlay::{OverlayMetrics, OverlaySurface};
pub use pipeline::{FieldSignature, RaymarchPipeline, RaymarchPipelineBuilder};
pub use render::{FrameRenderer, ShaderRuntime};
pub use state::{FrameState, RenderingParameters};
pub use view_mode::ViewMode;
