//! The `CliffRenderer` JS class.

use std::cell::RefCell;
use std::rc::Rc;

use cliffray_core::pipeline::{FieldSignature, RaymarchPipelineBuilder};
use cliffray_core::render::{FrameInput, FrameRenderer, GlowBackend, ShaderRuntime, StopHandle};
use cliffray_core::{FrameState, RenderError};
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use crate::canvas::CanvasContext;
use crate::overlay::CanvasOverlay;
use crate::scheduler::RafScheduler;
use crate::state::{parse_frame_state, preview_components};

fn to_js(e: RenderError) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

fn find_canvas(id: &str) -> Result<HtmlCanvasElement, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(id))
        .ok_or_else(|| JsValue::from_str(&format!("no element with id '{id}'")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str(&format!("element '{id}' is not a canvas")))
}

/// Calls the JS provider and decodes what it returns: a JSON string or a
/// plain object.
fn call_provider(provider: &js_sys::Function) -> Result<FrameState, RenderError> {
    let value = provider
        .call0(&JsValue::NULL)
        .map_err(|e| RenderError::Configuration(format!("state provider threw: {e:?}")))?;
    let json = match value.as_string() {
        Some(text) => text,
        None => js_sys::JSON::stringify(&value)
            .map(String::from)
            .map_err(|e| RenderError::Configuration(format!("state not serializable: {e:?}")))?,
    };
    parse_frame_state(&json)
}

/// Raymarches a Clifford field into a canvas.
#[wasm_bindgen]
pub struct CliffRenderer {
    canvas: HtmlCanvasElement,
    renderer: Rc<RefCell<FrameRenderer<GlowBackend>>>,
    scheduler: RafScheduler,
    stop: Option<StopHandle>,
}

#[wasm_bindgen]
impl CliffRenderer {
    /// Acquires a WebGL2 (or WebGL1) context on the canvas with `canvas_id`
    /// and links the raymarch program. Float texels are used when the
    /// context supports them, bytes otherwise.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<CliffRenderer, JsValue> {
        let canvas = find_canvas(canvas_id)?;
        let runtime = ShaderRuntime::initialize(&CanvasContext::new(canvas.clone())).map_err(to_js)?;
        let encoding = runtime.texture_encoding().map_err(to_js)?;

        let (width, height) = (canvas.width(), canvas.height());
        let camera = serde_json::json!({
            "position": [0.0, 0.0, 8.0],
            "target": [0.0, 0.0, 0.0],
            "up": [0.0, 1.0, 0.0],
            "fov": 60.0,
            "aspect_ratio": width.max(1) as f64 / height.max(1) as f64,
        });
        let pipeline = RaymarchPipelineBuilder::new()
            .with_encoding(encoding)
            .create_raymarching_pipeline(&FieldSignature::default(), &camera)
            .map_err(to_js)?;

        let mut renderer = FrameRenderer::new(runtime, pipeline, width, height).map_err(to_js)?;
        match CanvasOverlay::attach(&canvas) {
            Ok(overlay) => renderer.attach_overlay(Box::new(overlay)),
            Err(e) => log::warn!("overlay unavailable: {e:?}"),
        }

        Ok(CliffRenderer {
            canvas,
            renderer: Rc::new(RefCell::new(renderer)),
            scheduler: RafScheduler::new(),
            stop: None,
        })
    }

    /// Starts the animation loop. `provider` is called once per frame and
    /// returns the frame state as an object or JSON string. A provider or
    /// render error stops the loop and is logged to the console.
    pub fn start(&mut self, provider: js_sys::Function) -> Result<(), JsValue> {
        self.stop();
        let handle = FrameRenderer::start_render_loop(
            &self.renderer,
            move || call_provider(&provider),
            &self.scheduler,
        )
        .map_err(to_js)?;
        self.stop = Some(handle);
        Ok(())
    }

    /// Stops the loop. At most one more frame is drawn.
    pub fn stop(&mut self) {
        if let Some(handle) = self.stop.take() {
            handle.stop();
        }
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.stop.as_ref().is_some_and(StopHandle::is_running)
    }

    /// Renders one frame from a JSON state. Returns `false` if the state has
    /// no field.
    pub fn render_once(&self, state_json: &str) -> Result<bool, JsValue> {
        let state = parse_frame_state(state_json).map_err(to_js)?;
        let Some(input) = FrameInput::from_state(&state) else {
            return Ok(false);
        };
        let mut renderer = self
            .renderer
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("renderer is busy"))?;
        renderer.set_viewport(self.canvas.width(), self.canvas.height());
        renderer.render_frame(&input).map_err(to_js)?;
        Ok(true)
    }

    /// Resizes the drawing buffer and overlay.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), JsValue> {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.renderer
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("renderer is busy"))?
            .set_viewport(width, height);
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn frame_count(&self) -> f64 {
        self.renderer.borrow().frame_count() as f64
    }

    /// Stops the loop and releases all GPU resources. Idempotent.
    pub fn dispose(&mut self) {
        self.stop();
        match self.renderer.try_borrow_mut() {
            Ok(mut renderer) => renderer.dispose(),
            Err(_) => log::warn!("dispose called mid-frame; renderer left for the next call"),
        }
    }

    /// Stand-in field for `view` at `frame`; empty for `clifford`.
    pub fn preview_field(view: &str, frame: u32) -> Vec<f32> {
        preview_components(view, u64::from(frame))
    }
}
