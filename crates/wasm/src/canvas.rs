//! WebGL context acquisition for an HTML canvas.

use cliffray_core::render::{ContextSource, ContextVersion, GlowBackend};
use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext, WebGlContextAttributes, WebGlPowerPreference,
    WebGlRenderingContext,
};

/// Hands out glow backends for one canvas.
pub struct CanvasContext {
    canvas: HtmlCanvasElement,
}

impl CanvasContext {
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas }
    }

    /// Opaque, no depth buffer, no multisampling, discrete GPU preferred.
    fn attributes() -> WebGlContextAttributes {
        let attrs = WebGlContextAttributes::new();
        attrs.set_alpha(false);
        attrs.set_depth(false);
        attrs.set_antialias(false);
        attrs.set_power_preference(WebGlPowerPreference::HighPerformance);
        attrs
    }

    fn context<T: JsCast>(&self, id: &str) -> Option<T> {
        let attrs = Self::attributes();
        match self.canvas.get_context_with_context_options(id, attrs.as_ref()) {
            Ok(Some(ctx)) => ctx.dyn_into::<T>().ok(),
            Ok(None) => None,
            Err(e) => {
                log::warn!("{id} context request failed: {e:?}");
                None
            }
        }
    }
}

impl ContextSource for CanvasContext {
    type Backend = GlowBackend;

    fn webgl2(&self) -> Option<GlowBackend> {
        let ctx = self.context::<WebGl2RenderingContext>(ContextVersion::WebGl2.name())?;
        Some(GlowBackend::new(
            glow::Context::from_webgl2_context(ctx),
            ContextVersion::WebGl2,
        ))
    }

    fn webgl1(&self) -> Option<GlowBackend> {
        let ctx = self.context::<WebGlRenderingContext>(ContextVersion::WebGl1.name())?;
        Some(GlowBackend::new(
            glow::Context::from_webgl1_context(ctx),
            ContextVersion::WebGl1,
        ))
    }
}
