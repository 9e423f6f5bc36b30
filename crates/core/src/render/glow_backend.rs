//! [`GlBackend`] over a live `glow::Context`.
//!
//! Every call into glow is `unsafe` because it forwards to the driver. The
//! handles passed in were all created by this backend, and the only raw
//! data uploaded is the byte view of a [`TexelPayload`] or vertex slice.

use glow::HasContext;

use crate::encoding::{TexelPayload, TEXTURE_HEIGHT, TEXTURE_WIDTH};

use super::backend::{BufferTarget, BufferUsage, GlBackend, ShaderStage, UniformValue};
use super::context::ContextVersion;

/// A GL context plus the WebGL version it was created as.
pub struct GlowBackend {
    gl: glow::Context,
    version: ContextVersion,
}

impl GlowBackend {
    pub fn new(gl: glow::Context, version: ContextVersion) -> Self {
        Self { gl, version }
    }

    /// The wrapped context, for callers that need raw GL access.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// `(internal_format, format, type)` for a field texture upload.
    fn texel_format(&self, payload: &TexelPayload) -> (i32, u32, u32) {
        match (payload, self.version) {
            (TexelPayload::Float(_), ContextVersion::WebGl2) => {
                (glow::RGBA32F as i32, glow::RGBA, glow::FLOAT)
            }
            // WebGL1 with OES_texture_float keys the storage off the type.
            (TexelPayload::Float(_), ContextVersion::WebGl1) => {
                (glow::RGBA as i32, glow::RGBA, glow::FLOAT)
            }
            (TexelPayload::Bytes(_), _) => (glow::RGBA as i32, glow::RGBA, glow::UNSIGNED_BYTE),
        }
    }
}

impl std::fmt::Debug for GlowBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowBackend")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn target_enum(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn usage_enum(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StreamDraw => glow::STREAM_DRAW,
    }
}

#[allow(unsafe_code)]
impl GlBackend for GlowBackend {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;

    fn version(&self) -> ContextVersion {
        self.version
    }

    fn has_extension(&self, name: &str) -> bool {
        self.gl.supported_extensions().contains(name)
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<glow::Shader, String> {
        // SAFETY: stage_enum yields a valid shader type constant.
        unsafe { self.gl.create_shader(stage_enum(stage)) }
    }

    fn compile_shader(&self, shader: glow::Shader, source: &str) -> bool {
        // SAFETY: shader was created by create_shader on this context.
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        }
    }

    fn shader_info_log(&self, shader: glow::Shader) -> String {
        // SAFETY: valid shader handle.
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        // SAFETY: valid shader handle; deletion is deferred while attached.
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<glow::Program, String> {
        // SAFETY: no arguments.
        unsafe { self.gl.create_program() }
    }

    fn link_program(
        &self,
        program: glow::Program,
        vertex: glow::Shader,
        fragment: glow::Shader,
    ) -> bool {
        // SAFETY: all handles were created on this context. The program keeps
        // its linked binary after the shaders are detached.
        unsafe {
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            self.gl.link_program(program);
            let linked = self.gl.get_program_link_status(program);
            self.gl.detach_shader(program, vertex);
            self.gl.detach_shader(program, fragment);
            linked
        }
    }

    fn validate_program(&self, program: glow::Program) -> bool {
        // SAFETY: valid program handle.
        unsafe {
            self.gl.validate_program(program);
            // glow exposes no validate status query that works on every
            // platform; a validation failure always writes the info log.
            self.gl.get_program_info_log(program).trim().is_empty()
        }
    }

    fn program_info_log(&self, program: glow::Program) -> String {
        // SAFETY: valid program handle.
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&self, program: glow::Program) {
        // SAFETY: valid program handle.
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&self, program: Option<glow::Program>) {
        // SAFETY: None unbinds; Some is a linked program from this context.
        unsafe { self.gl.use_program(program) }
    }

    fn uniform_location(
        &self,
        program: glow::Program,
        name: &str,
    ) -> Option<glow::UniformLocation> {
        // SAFETY: valid program handle.
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn attrib_location(&self, program: glow::Program, name: &str) -> Option<u32> {
        // SAFETY: valid program handle.
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn create_buffer(
        &self,
        target: BufferTarget,
        usage: BufferUsage,
        data: &[u8],
    ) -> Result<glow::Buffer, String> {
        let target = target_enum(target);
        // SAFETY: the new buffer is bound only for the duration of the upload.
        unsafe {
            let buffer = self.gl.create_buffer()?;
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, data, usage_enum(usage));
            self.gl.bind_buffer(target, None);
            Ok(buffer)
        }
    }

    fn bind_vertex_attribute(&self, buffer: glow::Buffer, location: u32, components: i32) {
        // SAFETY: buffer holds tightly packed f32 vertices; location comes
        // from get_attrib_location on the bound program.
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.enable_vertex_attrib_array(location);
            self.gl
                .vertex_attrib_pointer_f32(location, components, glow::FLOAT, false, 0, 0);
        }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        // SAFETY: valid buffer handle.
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn create_field_texture(&self, payload: &TexelPayload) -> Result<glow::Texture, String> {
        let (internal, format, ty) = self.texel_format(payload);
        let bytes = payload.to_bytes();
        // SAFETY: bytes holds exactly TEXTURE_WIDTH x TEXTURE_HEIGHT RGBA
        // texels of the declared type.
        unsafe {
            let texture = self.gl.create_texture()?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            for (param, value) in [
                (glow::TEXTURE_MIN_FILTER, glow::NEAREST),
                (glow::TEXTURE_MAG_FILTER, glow::NEAREST),
                (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
                (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
            ] {
                self.gl.tex_parameter_i32(glow::TEXTURE_2D, param, value as i32);
            }
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                TEXTURE_WIDTH as i32,
                TEXTURE_HEIGHT as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(&bytes)),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(texture)
        }
    }

    fn update_field_texture(&self, texture: glow::Texture, payload: &TexelPayload) {
        let (_, format, ty) = self.texel_format(payload);
        let bytes = payload.to_bytes();
        // SAFETY: same dimensions and type the texture was allocated with.
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                TEXTURE_WIDTH as i32,
                TEXTURE_HEIGHT as i32,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(&bytes)),
            );
        }
    }

    fn bind_texture_unit(&self, texture: glow::Texture, unit: u32) {
        // SAFETY: unit is small (the field uses unit 0).
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        }
    }

    fn delete_texture(&self, texture: glow::Texture) {
        // SAFETY: valid texture handle.
        unsafe { self.gl.delete_texture(texture) }
    }

    fn set_uniform(&self, location: &glow::UniformLocation, value: UniformValue) {
        // SAFETY: location belongs to the program currently in use.
        unsafe {
            match value {
                UniformValue::Mat4(m) => {
                    self.gl.uniform_matrix_4_f32_slice(Some(location), false, &m);
                }
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(Some(location), x, y, z),
                UniformValue::Float(v) => self.gl.uniform_1_f32(Some(location), v),
                UniformValue::Int(v) => self.gl.uniform_1_i32(Some(location), v),
            }
        }
    }

    fn viewport(&self, width: i32, height: i32) {
        // SAFETY: plain state call.
        unsafe { self.gl.viewport(0, 0, width, height) }
    }

    fn clear(&self, [r, g, b, a]: [f32; 4]) {
        // SAFETY: plain state calls.
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_triangles(&self, vertex_count: i32) {
        // SAFETY: the bound attribute buffer holds at least vertex_count vertices.
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, 0, vertex_count) }
    }
}
