//! WebGL rendering of the Clifford field.
//!
//! The GPU side is reached through [`GlBackend`]; the real implementation
//! over `glow` is only built with the `render` feature.
//!
//! # Module overview
//!
//! - [`backend`] -- The GL operations the renderer uses, as a trait.
//! - [`context`] -- WebGL version, float capability and context acquisition.
//! - [`shader`] -- Shader runtime: compile, link, validate, track, dispose.
//! - [`texture`] -- The 4x1 field texture, updated in place.
//! - [`fullscreen`] -- Fullscreen quad geometry.
//! - [`frame`] -- Per-frame uniforms, draw call and overlay.
//! - [`frame_loop`] -- Render loop over a host frame scheduler.

pub mod backend;
pub mod context;
pub mod frame;
pub mod frame_loop;
pub mod fullscreen;
#[cfg(feature = "render")]
pub mod glow_backend;
pub mod shader;
pub mod texture;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::{BufferTarget, BufferUsage, GlBackend, ShaderStage, UniformValue};
pub use context::{ContextSource, ContextVersion};
pub use frame::{FrameInput, FrameRenderer, StopHandle};
pub use frame_loop::{FrameScheduler, LoopControl};
#[cfg(feature = "render")]
pub use glow_backend::GlowBackend;
pub use shader::{format_shader_error, ShaderRuntime};
pub use texture::FieldTexture;
