//! The GL operations the raymarch renderer needs, as a trait.
//!
//! [`GlBackend`] is deliberately narrow: shader and program lifecycle,
//! vertex buffers, the single field texture, uniforms and one draw call.
//! `GlowBackend` (feature `render`) implements it over `glow::Context`; tests
//! implement it with a recording fake so frame logic runs without a GPU.
//!
//! Methods mirror GL semantics: object creation can fail with a driver
//! message, status queries return `bool`, everything else is fire and forget.

use std::fmt;

use crate::encoding::TexelPayload;

use super::context::ContextVersion;

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Buffer binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferTarget {
    /// Vertex attributes.
    #[default]
    Array,
    /// Index data.
    ElementArray,
}

/// Expected update frequency of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// A value for one uniform upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
    Vec3([f32; 3]),
    Float(f32),
    /// Integer, also used for sampler texture units.
    Int(i32),
}

/// A WebGL-like context.
pub trait GlBackend {
    type Shader: Copy + fmt::Debug;
    type Program: Copy + fmt::Debug;
    type Buffer: Copy + fmt::Debug;
    type Texture: Copy + fmt::Debug + PartialEq;
    type UniformLocation: Clone + fmt::Debug;

    fn version(&self) -> ContextVersion;
    fn has_extension(&self, name: &str) -> bool;

    /// Whether float field texels can be uploaded and sampled.
    fn supports_float_textures(&self) -> bool {
        self.has_extension(self.version().float_texture_extension())
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    /// Sets the source and compiles; returns the compile status.
    fn compile_shader(&self, shader: Self::Shader, source: &str) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    /// Attaches both stages, links and detaches; returns the link status.
    fn link_program(
        &self,
        program: Self::Program,
        vertex: Self::Shader,
        fragment: Self::Shader,
    ) -> bool;
    fn validate_program(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;

    fn create_buffer(
        &self,
        target: BufferTarget,
        usage: BufferUsage,
        data: &[u8],
    ) -> Result<Self::Buffer, String>;
    /// Points float attribute `location` at `buffer` with `components` per vertex.
    fn bind_vertex_attribute(&self, buffer: Self::Buffer, location: u32, components: i32);
    fn delete_buffer(&self, buffer: Self::Buffer);

    /// Allocates the 4x1 field texture (nearest filtering, clamped) with
    /// initial contents.
    fn create_field_texture(&self, payload: &TexelPayload) -> Result<Self::Texture, String>;
    /// Replaces the texture contents in place.
    fn update_field_texture(&self, texture: Self::Texture, payload: &TexelPayload);
    fn bind_texture_unit(&self, texture: Self::Texture, unit: u32);
    fn delete_texture(&self, texture: Self::Texture);

    fn set_uniform(&self, location: &Self::UniformLocation, value: UniformValue);
    fn viewport(&self, width: i32, height: i32);
    fn clear(&self, color: [f32; 4]);
    fn draw_triangles(&self, vertex_count: i32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fake::FakeBackend;

    #[test]
    fn stage_names() {
        assert_eq!(ShaderStage::Vertex.to_string(), "vertex");
        assert_eq!(ShaderStage::Fragment.name(), "fragment");
    }

    #[test]
    fn buffer_defaults_are_vertex_static() {
        assert_eq!(BufferTarget::default(), BufferTarget::Array);
        assert_eq!(BufferUsage::default(), BufferUsage::StaticDraw);
    }

    #[test]
    fn float_support_follows_version_extension() {
        let webgl2 = FakeBackend::new(ContextVersion::WebGl2).with_extension("EXT_color_buffer_float");
        let webgl1 = FakeBackend::new(ContextVersion::WebGl1).with_extension("OES_texture_float");
        let webgl1_wrong = FakeBackend::new(ContextVersion::WebGl1).with_extension("EXT_color_buffer_float");
        assert!(webgl2.supports_float_textures());
        assert!(webgl1.supports_float_textures());
        assert!(!webgl1_wrong.supports_float_textures());
        assert!(!FakeBackend::new(ContextVersion::WebGl2).supports_float_textures());
    }
}
