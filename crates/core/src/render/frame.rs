//! Per-frame driver: field texture, uniforms, draw call and overlay.

use std::cell::Cell;
use std::rc::Rc;

use crate::camera::{CameraState, MatrixCache};
use crate::encoding::TextureEncoding;
use crate::error::RenderError;
use crate::field::MultivectorField;
use crate::graph::GraphSnapshot;
use crate::overlay::{OverlayInput, OverlayMetrics, OverlaySurface};
use crate::pipeline::{
    RaymarchPipeline, ATTRIBUTE_POSITION, FIELD_TEXTURE_UNIT, UNIFORM_CAMERA_POSITION,
    UNIFORM_FIELD, UNIFORM_INVERSE_PROJECTION, UNIFORM_INVERSE_VIEW, UNIFORM_MAX_DISTANCE,
    UNIFORM_MIN_DISTANCE,
};
use crate::state::{FrameState, RenderingParameters};
use crate::view_mode::ViewMode;

use super::backend::{GlBackend, UniformValue};
use super::fullscreen::{FULLSCREEN_QUAD, QUAD_COMPONENTS, QUAD_VERTEX_COUNT};
use super::shader::ShaderRuntime;
use super::texture::FieldTexture;

/// Background the canvas is cleared to before drawing.
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.1, 1.0];
/// Name of the raymarch program in the shader runtime.
pub const PROGRAM_NAME: &str = "raymarch";

const DELTA_LOG_INTERVAL: u64 = 100;
const GRAPH_LOG_INTERVAL: u64 = 120;

/// Borrowed inputs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub field: &'a MultivectorField,
    pub camera: &'a CameraState,
    pub rendering: &'a RenderingParameters,
    pub audio_coherence: f32,
    pub graph: Option<&'a GraphSnapshot>,
    pub metrics: Option<&'a OverlayMetrics>,
    pub view: ViewMode,
}

impl<'a> FrameInput<'a> {
    /// Borrows a provider snapshot; `None` when it carries no field.
    pub fn from_state(state: &'a FrameState) -> Option<Self> {
        let field = state.clifford_field.as_ref()?;
        Some(Self {
            field,
            camera: &state.camera,
            rendering: &state.rendering,
            audio_coherence: state.audio_coherence,
            graph: state.current_graph.as_ref(),
            metrics: state.metrics.as_ref(),
            view: state.view_mode(),
        })
    }
}

/// Cached uniform locations. `None` means the driver dropped the uniform.
#[derive(Debug)]
struct Uniforms<L> {
    inverse_view: Option<L>,
    inverse_projection: Option<L>,
    camera_position: Option<L>,
    min_distance: Option<L>,
    max_distance: Option<L>,
    field: Option<L>,
}

/// Cooperative cancellation flag shared with a running render loop.
#[derive(Debug, Clone)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.0.get()
    }
}

/// Owns the raymarch pipeline and all GPU state needed to draw it.
pub struct FrameRenderer<B: GlBackend> {
    runtime: ShaderRuntime<B>,
    pipeline: RaymarchPipeline,
    uniforms: Uniforms<B::UniformLocation>,
    position_attribute: u32,
    quad: B::Buffer,
    field_texture: Option<FieldTexture<B::Texture>>,
    matrices: MatrixCache,
    previous_field: Option<MultivectorField>,
    frame_count: u64,
    running: Rc<Cell<bool>>,
    overlay: Option<Box<dyn OverlaySurface>>,
    overlay_drawn: bool,
    viewport: (u32, u32),
}

impl<B: GlBackend> FrameRenderer<B> {
    /// Links and validates `pipeline`'s program and uploads the quad.
    ///
    /// # Errors
    ///
    /// `RenderError::Unsupported` if the pipeline expects float texels the
    /// context cannot sample; otherwise any compile, link or validation
    /// failure.
    pub fn new(
        mut runtime: ShaderRuntime<B>,
        pipeline: RaymarchPipeline,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        check_encoding(&runtime, pipeline.encoding)?;
        let (uniforms, position_attribute) = link_pipeline(&mut runtime, &pipeline)?;
        let quad = runtime.create_buffer(&FULLSCREEN_QUAD, None, None)?;

        log::info!(
            "frame renderer ready: {} steps, {} field texels, {width}x{height}",
            pipeline.rendering.max_steps,
            pipeline.encoding.name()
        );

        Ok(Self {
            runtime,
            pipeline,
            uniforms,
            position_attribute,
            quad,
            field_texture: None,
            matrices: MatrixCache::new(),
            previous_field: None,
            frame_count: 0,
            running: Rc::new(Cell::new(false)),
            overlay: None,
            overlay_drawn: false,
            viewport: (width, height),
        })
    }

    /// Swaps in a new pipeline. The program is only rebuilt when the shader
    /// sources differ; the field texture is recreated on an encoding change.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new). On error the previous pipeline stays active.
    pub fn set_pipeline(&mut self, pipeline: RaymarchPipeline) -> Result<(), RenderError> {
        check_encoding(&self.runtime, pipeline.encoding)?;
        if !pipeline.same_program(&self.pipeline) {
            let (uniforms, position_attribute) = link_pipeline(&mut self.runtime, &pipeline)?;
            self.uniforms = uniforms;
            self.position_attribute = position_attribute;
        }
        if pipeline.encoding != self.pipeline.encoding {
            if let Some(texture) = self.field_texture.take() {
                texture.destroy(self.runtime.backend()?);
            }
        }
        self.pipeline = pipeline;
        Ok(())
    }

    pub fn pipeline(&self) -> &RaymarchPipeline {
        &self.pipeline
    }

    pub fn runtime(&self) -> &ShaderRuntime<B> {
        &self.runtime
    }

    /// Attaches the 2D overlay surface, sized to the current viewport.
    pub fn attach_overlay(&mut self, mut surface: Box<dyn OverlaySurface>) {
        surface.resize(self.viewport.0, self.viewport.1);
        self.overlay = Some(surface);
        self.overlay_drawn = false;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if self.viewport == (width, height) {
            return;
        }
        self.viewport = (width, height);
        if let Some(surface) = self.overlay.as_mut() {
            surface.resize(width, height);
        }
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Draws one frame.
    ///
    /// # Errors
    ///
    /// `RenderError::NotInitialized` after [`dispose`](Self::dispose), or
    /// `RenderError::Gpu` if the field texture cannot be created.
    pub fn render_frame(&mut self, input: &FrameInput<'_>) -> Result<(), RenderError> {
        let backend = self.runtime.backend()?;
        self.frame_count += 1;

        match self.field_texture.as_mut() {
            Some(texture) => texture.update(backend, input.field),
            None => {
                self.field_texture = Some(FieldTexture::create(
                    backend,
                    self.pipeline.encoding,
                    input.field,
                )?);
            }
        }

        let matrices = self.matrices.matrices(input.camera);
        let (width, height) = self.viewport;
        backend.viewport(to_i32(width), to_i32(height));
        backend.clear(CLEAR_COLOR);

        self.runtime.use_program(PROGRAM_NAME)?;
        let u = &self.uniforms;
        set(backend, &u.inverse_view, UniformValue::Mat4(matrices.inverse_view.to_cols_array()));
        set(
            backend,
            &u.inverse_projection,
            UniformValue::Mat4(matrices.inverse_projection.to_cols_array()),
        );
        set(
            backend,
            &u.camera_position,
            UniformValue::Vec3(input.camera.position.to_array()),
        );
        set(backend, &u.min_distance, UniformValue::Float(input.rendering.min_distance));
        set(backend, &u.max_distance, UniformValue::Float(input.rendering.max_distance));

        if let Some(texture) = &self.field_texture {
            backend.bind_texture_unit(texture.handle(), FIELD_TEXTURE_UNIT);
        }
        set(backend, &u.field, UniformValue::Int(FIELD_TEXTURE_UNIT as i32));

        backend.bind_vertex_attribute(self.quad, self.position_attribute, QUAD_COMPONENTS);
        backend.draw_triangles(QUAD_VERTEX_COUNT);

        self.draw_overlay(input);
        self.log_diagnostics(input);
        self.previous_field = Some(*input.field);
        Ok(())
    }

    fn draw_overlay(&mut self, input: &FrameInput<'_>) {
        let Some(surface) = self.overlay.as_mut() else {
            return;
        };
        match input.view.overlay() {
            Some(strategy) => {
                let overlay_input = OverlayInput {
                    graph: input.graph,
                    metrics: input.metrics,
                    audio_coherence: input.audio_coherence,
                    width: self.viewport.0 as f32,
                    height: self.viewport.1 as f32,
                };
                strategy.draw(surface.as_mut(), &overlay_input);
                self.overlay_drawn = true;
            }
            None if self.overlay_drawn => {
                surface.clear();
                self.overlay_drawn = false;
            }
            None => {}
        }
    }

    fn log_diagnostics(&self, input: &FrameInput<'_>) {
        if self.frame_count % DELTA_LOG_INTERVAL == 0 {
            if let Some(previous) = &self.previous_field {
                log::debug!(
                    "frame {}: field delta {:.4}, |field| {:.3}",
                    self.frame_count,
                    input.field.delta_norm(previous),
                    input.field.l1_norm()
                );
            }
        }
        if self.frame_count % GRAPH_LOG_INTERVAL == 0 {
            if let Some(graph) = input.graph {
                log::debug!(
                    "frame {}: graph {} nodes, {} edges ({} view)",
                    self.frame_count,
                    graph.nodes.len(),
                    graph.edges.len(),
                    input.view
                );
            }
        }
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The live field texture handle, once the first frame has been drawn.
    pub fn field_texture(&self) -> Option<B::Texture> {
        self.field_texture.as_ref().map(FieldTexture::handle)
    }

    pub fn texture_encoding(&self) -> TextureEncoding {
        self.pipeline.encoding
    }

    /// Camera matrix cache, for diagnostics.
    pub fn matrix_cache(&self) -> &MatrixCache {
        &self.matrices
    }

    pub(crate) fn start(&self) -> StopHandle {
        self.running.set(true);
        self.stop_handle()
    }

    /// A handle that stops the render loop without borrowing the renderer.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Rc::clone(&self.running))
    }

    /// Asks a running loop to exit. At most one more frame is drawn.
    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.runtime.is_disposed()
    }

    /// Stops the loop and releases the field texture, programs and buffers.
    /// The overlay is cleared. Idempotent.
    pub fn dispose(&mut self) {
        self.stop();
        if let (Some(texture), Ok(backend)) = (self.field_texture.take(), self.runtime.backend()) {
            texture.destroy(backend);
        }
        self.runtime.dispose();
        if let Some(mut surface) = self.overlay.take() {
            surface.clear();
        }
        self.previous_field = None;
    }
}

fn check_encoding<B: GlBackend>(
    runtime: &ShaderRuntime<B>,
    encoding: TextureEncoding,
) -> Result<(), RenderError> {
    if encoding == TextureEncoding::Float32 && !runtime.backend()?.supports_float_textures() {
        return Err(RenderError::Unsupported(
            "float field textures are unavailable; build the pipeline with quantized_u8".into(),
        ));
    }
    Ok(())
}

fn link_pipeline<B: GlBackend>(
    runtime: &mut ShaderRuntime<B>,
    pipeline: &RaymarchPipeline,
) -> Result<(Uniforms<B::UniformLocation>, u32), RenderError> {
    runtime.create_program(
        &pipeline.vertex_source,
        &pipeline.fragment_source,
        PROGRAM_NAME,
    )?;
    runtime.validate_program(PROGRAM_NAME)?;

    let location = |name: &str| runtime.get_uniform_location(PROGRAM_NAME, name);
    let uniforms = Uniforms {
        inverse_view: location(UNIFORM_INVERSE_VIEW)?,
        inverse_projection: location(UNIFORM_INVERSE_PROJECTION)?,
        camera_position: location(UNIFORM_CAMERA_POSITION)?,
        min_distance: location(UNIFORM_MIN_DISTANCE)?,
        max_distance: location(UNIFORM_MAX_DISTANCE)?,
        field: location(UNIFORM_FIELD)?,
    };
    let position = runtime.get_attrib_location(PROGRAM_NAME, ATTRIBUTE_POSITION)?;
    Ok((uniforms, position))
}

fn set<B: GlBackend>(backend: &B, location: &Option<B::UniformLocation>, value: UniformValue) {
    if let Some(location) = location {
        backend.set_uniform(location, value);
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::recording::{DrawOp, RecordingSurface};
    use crate::pipeline::{FieldSignature, RaymarchPipelineBuilder};
    use crate::render::context::ContextVersion;
    use crate::render::fake::{pipeline, FakeBackend, GlCall};
    use glam::Vec3;
    use std::cell::RefCell;

    fn renderer() -> (FrameRenderer<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::webgl2();
        let runtime = ShaderRuntime::with_backend(backend.clone());
        let renderer =
            FrameRenderer::new(runtime, pipeline(TextureEncoding::Float32), 640, 480).unwrap();
        (renderer, backend)
    }

    fn frame_state(field: MultivectorField) -> FrameState {
        FrameState {
            clifford_field: Some(field),
            ..FrameState::default()
        }
    }

    /// Overlay surface whose draw log outlives the renderer.
    #[derive(Clone, Default)]
    struct SharedSurface(Rc<RefCell<RecordingSurface>>);

    impl OverlaySurface for SharedSurface {
        fn resize(&mut self, width: u32, height: u32) {
            self.0.borrow_mut().resize(width, height);
        }
        fn clear(&mut self) {
            self.0.borrow_mut().clear();
        }
        fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: crate::overlay::Rgba) {
            self.0.borrow_mut().fill_rect(x, y, w, h, color);
        }
        fn stroke_line(
            &mut self,
            from: glam::Vec2,
            to: glam::Vec2,
            width: f32,
            color: crate::overlay::Rgba,
        ) {
            self.0.borrow_mut().stroke_line(from, to, width, color);
        }
        fn fill_circle(&mut self, center: glam::Vec2, radius: f32, color: crate::overlay::Rgba) {
            self.0.borrow_mut().fill_circle(center, radius, color);
        }
        fn fill_text(&mut self, text: &str, at: glam::Vec2, size: f32, color: crate::overlay::Rgba) {
            self.0.borrow_mut().fill_text(text, at, size, color);
        }
    }

    #[test]
    fn from_state_skips_missing_field() {
        assert!(FrameInput::from_state(&FrameState::default()).is_none());
        let state = frame_state(MultivectorField::zeros());
        assert!(FrameInput::from_state(&state).is_some());
    }

    #[test]
    fn field_texture_is_created_once_then_updated() {
        let (mut renderer, backend) = renderer();
        for i in 0..4 {
            let state = frame_state(MultivectorField::zeros().with(3, i as f32));
            renderer
                .render_frame(&FrameInput::from_state(&state).unwrap())
                .unwrap();
        }
        let handle = renderer.field_texture().unwrap();
        assert_eq!(backend.count(|c| matches!(c, GlCall::CreateTexture(..))), 1);
        assert_eq!(
            backend.count(|c| matches!(c, GlCall::UpdateTexture(h, _) if *h == handle)),
            3
        );
        assert_eq!(renderer.frame_count(), 4);
    }

    #[test]
    fn frame_clears_sets_uniforms_and_draws_six_vertices() {
        let (mut renderer, backend) = renderer();
        backend.clear_calls();
        let state = frame_state(MultivectorField::zeros());
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();

        let calls = backend.calls();
        assert!(calls.contains(&GlCall::Viewport(640, 480)));
        assert!(calls.contains(&GlCall::Clear(CLEAR_COLOR)));
        assert_eq!(calls.last(), Some(&GlCall::Draw(6)));
        assert!(calls.contains(&GlCall::Uniform(
            UNIFORM_CAMERA_POSITION.into(),
            UniformValue::Vec3([0.0, 0.0, 8.0])
        )));
        assert!(calls.contains(&GlCall::Uniform(
            UNIFORM_MAX_DISTANCE.into(),
            UniformValue::Float(500.0)
        )));
        assert!(calls.contains(&GlCall::Uniform(UNIFORM_FIELD.into(), UniformValue::Int(0))));
        let texture = renderer.field_texture().unwrap();
        assert!(calls.contains(&GlCall::BindTexture { texture, unit: 0 }));
    }

    #[test]
    fn unchanged_camera_reuses_matrices() {
        let (mut renderer, _) = renderer();
        let mut state = frame_state(MultivectorField::zeros());
        for _ in 0..3 {
            renderer
                .render_frame(&FrameInput::from_state(&state).unwrap())
                .unwrap();
        }
        assert_eq!(renderer.matrix_cache().recomputations(), 1);

        state.camera.position = Vec3::new(1.0, 2.0, 3.0);
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        assert_eq!(renderer.matrix_cache().recomputations(), 2);
    }

    #[test]
    fn float_pipeline_on_byte_only_context_is_unsupported() {
        let runtime = ShaderRuntime::with_backend(FakeBackend::new(ContextVersion::WebGl1));
        let result = FrameRenderer::new(runtime, pipeline(TextureEncoding::Float32), 1, 1);
        assert!(matches!(result, Err(RenderError::Unsupported(_))));
    }

    #[test]
    fn quantized_pipeline_uploads_bytes() {
        let backend = FakeBackend::new(ContextVersion::WebGl1);
        let runtime = ShaderRuntime::with_backend(backend.clone());
        let mut renderer =
            FrameRenderer::new(runtime, pipeline(TextureEncoding::QuantizedU8), 8, 8).unwrap();
        let state = frame_state(MultivectorField::zeros());
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        assert_eq!(
            backend.count(|c| matches!(c, GlCall::CreateTexture(_, TextureEncoding::QuantizedU8))),
            1
        );
    }

    #[test]
    fn set_pipeline_relinks_only_on_source_change() {
        let (mut renderer, backend) = renderer();
        let programs = |b: &FakeBackend| b.count(|c| matches!(c, GlCall::CreateProgram(_)));
        assert_eq!(programs(&backend), 1);

        let mut same = pipeline(TextureEncoding::Float32);
        same.camera.fov = 30.0;
        renderer.set_pipeline(same).unwrap();
        assert_eq!(programs(&backend), 1);

        let camera = serde_json::to_value(renderer.pipeline().camera).unwrap();
        let steps = RaymarchPipelineBuilder::new()
            .with_max_steps(128)
            .create_raymarching_pipeline(&FieldSignature::default(), &camera)
            .unwrap();
        renderer.set_pipeline(steps).unwrap();
        assert_eq!(programs(&backend), 2);
        assert_eq!(renderer.pipeline().rendering.max_steps, 128);
    }

    #[test]
    fn encoding_change_recreates_texture() {
        let (mut renderer, backend) = renderer();
        let state = frame_state(MultivectorField::zeros());
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        let first = renderer.field_texture().unwrap();

        renderer
            .set_pipeline(pipeline(TextureEncoding::QuantizedU8))
            .unwrap();
        assert!(renderer.field_texture().is_none());
        assert!(backend.calls().contains(&GlCall::DeleteTexture(first)));

        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        assert_ne!(renderer.field_texture(), Some(first));
    }

    #[test]
    fn overlay_follows_view_mode_and_clears_on_clifford() {
        let (mut renderer, _) = renderer();
        let surface = SharedSurface::default();
        renderer.attach_overlay(Box::new(surface.clone()));
        assert_eq!(surface.0.borrow().ops, vec![DrawOp::Resize(640, 480)]);

        let mut state = frame_state(MultivectorField::zeros());
        state.view = "sheaf".into();
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        assert!(surface.0.borrow().texts().contains(&"Sheaf Tree View"));

        surface.0.borrow_mut().ops.clear();
        state.view = "clifford".into();
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        assert_eq!(surface.0.borrow().ops, vec![DrawOp::Clear]);

        // Already clear: nothing more to do.
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        assert_eq!(surface.0.borrow().ops, vec![DrawOp::Clear]);
    }

    #[test]
    fn viewport_change_resizes_overlay() {
        let (mut renderer, backend) = renderer();
        let surface = SharedSurface::default();
        renderer.attach_overlay(Box::new(surface.clone()));
        renderer.set_viewport(320, 200);
        assert_eq!(
            surface.0.borrow().ops.last(),
            Some(&DrawOp::Resize(320, 200))
        );
        let state = frame_state(MultivectorField::zeros());
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        assert!(backend.calls().contains(&GlCall::Viewport(320, 200)));
    }

    #[test]
    fn dispose_releases_gpu_objects_and_is_idempotent() {
        let (mut renderer, backend) = renderer();
        let state = frame_state(MultivectorField::zeros());
        renderer
            .render_frame(&FrameInput::from_state(&state).unwrap())
            .unwrap();
        assert!(backend.live_objects() > 0);

        renderer.dispose();
        assert_eq!(backend.live_objects(), 0);
        assert!(renderer.is_disposed());
        assert!(!renderer.is_running());

        let calls = backend.calls().len();
        renderer.dispose();
        assert_eq!(backend.calls().len(), calls);
        assert!(matches!(
            renderer.render_frame(&FrameInput::from_state(&state).unwrap()),
            Err(RenderError::NotInitialized)
        ));
    }

    #[test]
    fn texture_failure_surfaces_as_gpu_error() {
        let (mut renderer, backend) = renderer();
        backend.fail_texture(true);
        let state = frame_state(MultivectorField::zeros());
        let result = renderer.render_frame(&FrameInput::from_state(&state).unwrap());
        assert!(matches!(result, Err(RenderError::Gpu(_))));
    }
}
