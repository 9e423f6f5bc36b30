//! Recording [`GlBackend`] for tests.
//!
//! Handles are sequential integers. Every call is appended to a shared log so
//! a test can keep a clone of the backend, hand the original to the runtime
//! and inspect what happened afterwards.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::encoding::{TexelPayload, TextureEncoding};
use crate::pipeline::{FieldSignature, RaymarchPipeline, RaymarchPipelineBuilder};

use super::backend::{BufferTarget, BufferUsage, GlBackend, ShaderStage, UniformValue};
use super::context::{ContextSource, ContextVersion};

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateShader(u32, ShaderStage),
    DeleteShader(u32),
    CreateProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    CreateBuffer(u32, usize),
    DeleteBuffer(u32),
    BindAttribute { buffer: u32, location: u32 },
    CreateTexture(u32, TextureEncoding),
    UpdateTexture(u32, TexelPayload),
    BindTexture { texture: u32, unit: u32 },
    DeleteTexture(u32),
    Uniform(String, UniformValue),
    Viewport(i32, i32),
    Clear([f32; 4]),
    Draw(i32),
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: Cell<u32>,
    calls: RefCell<Vec<GlCall>>,
    live: RefCell<BTreeSet<u32>>,
    fail_compile_on: RefCell<Option<String>>,
    fail_link: Cell<bool>,
    fail_validate: Cell<bool>,
    fail_texture: Cell<bool>,
}

#[derive(Debug, Clone)]
pub struct FakeBackend {
    version: ContextVersion,
    extensions: Vec<&'static str>,
    state: Rc<FakeState>,
}

impl FakeBackend {
    pub fn new(version: ContextVersion) -> Self {
        Self {
            version,
            extensions: Vec::new(),
            state: Rc::default(),
        }
    }

    /// A WebGL2 backend with float texture support.
    pub fn webgl2() -> Self {
        Self::new(ContextVersion::WebGl2).with_extension("EXT_color_buffer_float")
    }

    pub fn with_extension(mut self, name: &'static str) -> Self {
        self.extensions.push(name);
        self
    }

    /// Compilation fails for any source containing `marker`.
    pub fn fail_compile_on(&self, marker: &str) {
        *self.state.fail_compile_on.borrow_mut() = Some(marker.to_owned());
    }

    pub fn fail_link(&self, fail: bool) {
        self.state.fail_link.set(fail);
    }

    pub fn fail_validate(&self, fail: bool) {
        self.state.fail_validate.set(fail);
    }

    pub fn fail_texture(&self, fail: bool) {
        self.state.fail_texture.set(fail);
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.state.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.state.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.calls.borrow_mut().clear();
    }

    /// Handles created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.state.live.borrow().len()
    }

    fn record(&self, call: GlCall) {
        self.state.calls.borrow_mut().push(call);
    }

    fn allocate(&self) -> u32 {
        let id = self.state.next_id.get() + 1;
        self.state.next_id.set(id);
        self.state.live.borrow_mut().insert(id);
        id
    }

    fn release(&self, id: u32) {
        self.state.live.borrow_mut().remove(&id);
    }
}

impl GlBackend for FakeBackend {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type Texture = u32;
    type UniformLocation = String;

    fn version(&self) -> ContextVersion {
        self.version
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| *ext == name)
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let id = self.allocate();
        self.record(GlCall::CreateShader(id, stage));
        Ok(id)
    }

    fn compile_shader(&self, _shader: u32, source: &str) -> bool {
        match self.state.fail_compile_on.borrow().as_deref() {
            Some(marker) => !source.contains(marker),
            None => true,
        }
    }

    fn shader_info_log(&self, _shader: u32) -> String {
        "ERROR: 0:1: fake compile failure".to_owned()
    }

    fn delete_shader(&self, shader: u32) {
        self.release(shader);
        self.record(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, String> {
        let id = self.allocate();
        self.record(GlCall::CreateProgram(id));
        Ok(id)
    }

    fn link_program(&self, _program: u32, _vertex: u32, _fragment: u32) -> bool {
        !self.state.fail_link.get()
    }

    fn validate_program(&self, _program: u32) -> bool {
        !self.state.fail_validate.get()
    }

    fn program_info_log(&self, _program: u32) -> String {
        "fake program log".to_owned()
    }

    fn delete_program(&self, program: u32) {
        self.release(program);
        self.record(GlCall::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(GlCall::UseProgram(program));
    }

    fn uniform_location(&self, _program: u32, name: &str) -> Option<String> {
        Some(name.to_owned())
    }

    fn attrib_location(&self, _program: u32, _name: &str) -> Option<u32> {
        Some(0)
    }

    fn create_buffer(
        &self,
        _target: BufferTarget,
        _usage: BufferUsage,
        data: &[u8],
    ) -> Result<u32, String> {
        let id = self.allocate();
        self.record(GlCall::CreateBuffer(id, data.len()));
        Ok(id)
    }

    fn bind_vertex_attribute(&self, buffer: u32, location: u32, _components: i32) {
        self.record(GlCall::BindAttribute { buffer, location });
    }

    fn delete_buffer(&self, buffer: u32) {
        self.release(buffer);
        self.record(GlCall::DeleteBuffer(buffer));
    }

    fn create_field_texture(&self, payload: &TexelPayload) -> Result<u32, String> {
        if self.state.fail_texture.get() {
            return Err("out of memory".to_owned());
        }
        let id = self.allocate();
        self.record(GlCall::CreateTexture(id, payload.encoding()));
        Ok(id)
    }

    fn update_field_texture(&self, texture: u32, payload: &TexelPayload) {
        self.record(GlCall::UpdateTexture(texture, *payload));
    }

    fn bind_texture_unit(&self, texture: u32, unit: u32) {
        self.record(GlCall::BindTexture { texture, unit });
    }

    fn delete_texture(&self, texture: u32) {
        self.release(texture);
        self.record(GlCall::DeleteTexture(texture));
    }

    fn set_uniform(&self, location: &String, value: UniformValue) {
        self.record(GlCall::Uniform(location.clone(), value));
    }

    fn viewport(&self, width: i32, height: i32) {
        self.record(GlCall::Viewport(width, height));
    }

    fn clear(&self, color: [f32; 4]) {
        self.record(GlCall::Clear(color));
    }

    fn draw_triangles(&self, vertex_count: i32) {
        self.record(GlCall::Draw(vertex_count));
    }
}

/// Hands out clones of preset backends per version.
#[derive(Debug, Default)]
pub struct FakeSource {
    pub webgl2: Option<FakeBackend>,
    pub webgl1: Option<FakeBackend>,
}

impl ContextSource for FakeSource {
    type Backend = FakeBackend;

    fn webgl2(&self) -> Option<FakeBackend> {
        self.webgl2.clone()
    }

    fn webgl1(&self) -> Option<FakeBackend> {
        self.webgl1.clone()
    }
}

/// A default pipeline for a camera at (0, 0, 5) looking at the origin.
pub fn pipeline(encoding: TextureEncoding) -> RaymarchPipeline {
    let camera = serde_json::json!({
        "position": [0.0, 0.0, 5.0],
        "target": [0.0, 0.0, 0.0],
        "up": [0.0, 1.0, 0.0],
        "fov": 60.0,
        "aspect_ratio": 1.0
    });
    RaymarchPipelineBuilder::new()
        .with_encoding(encoding)
        .create_raymarching_pipeline(&FieldSignature::default(), &camera)
        .expect("test pipeline")
}
