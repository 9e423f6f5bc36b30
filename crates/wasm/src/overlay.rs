//! 2D overlay surface on a canvas stacked over the GL canvas.

use cliffray_core::overlay::{OverlaySurface, Rgba};
use glam::Vec2;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

/// A pointer-transparent canvas positioned over the GL canvas.
pub struct CanvasOverlay {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasOverlay {
    /// Creates the overlay canvas and inserts it next to `gl_canvas`.
    ///
    /// # Errors
    ///
    /// Any DOM failure, as the thrown JS value.
    pub fn attach(gl_canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let document = gl_canvas
            .owner_document()
            .ok_or_else(|| JsValue::from_str("canvas is not in a document"))?;
        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;

        let style = canvas.style();
        style.set_property("position", "absolute")?;
        style.set_property("left", &format!("{}px", gl_canvas.offset_left()))?;
        style.set_property("top", &format!("{}px", gl_canvas.offset_top()))?;
        style.set_property("pointer-events", "none")?;
        style.set_property("z-index", "10")?;

        let parent = gl_canvas
            .parent_node()
            .ok_or_else(|| JsValue::from_str("canvas has no parent"))?;
        parent.append_child(&canvas)?;

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into()?;
        Ok(Self { canvas, ctx })
    }

    #[allow(deprecated)]
    fn fill_style(&self, color: Rgba) {
        self.ctx.set_fill_style(&JsValue::from_str(&color.css()));
    }
}

impl Drop for CanvasOverlay {
    fn drop(&mut self) {
        self.canvas.remove();
    }
}

impl OverlaySurface for CanvasOverlay {
    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn clear(&mut self) {
        let (w, h) = (self.canvas.width(), self.canvas.height());
        self.ctx.clear_rect(0.0, 0.0, f64::from(w), f64::from(h));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        self.fill_style(color);
        self.ctx
            .fill_rect(f64::from(x), f64::from(y), f64::from(w), f64::from(h));
    }

    #[allow(deprecated)]
    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba) {
        self.ctx.set_stroke_style(&JsValue::from_str(&color.css()));
        self.ctx.set_line_width(f64::from(width));
        self.ctx.begin_path();
        self.ctx.move_to(f64::from(from.x), f64::from(from.y));
        self.ctx.line_to(f64::from(to.x), f64::from(to.y));
        self.ctx.stroke();
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.fill_style(color);
        self.ctx.begin_path();
        let arc = self.ctx.arc(
            f64::from(center.x),
            f64::from(center.y),
            f64::from(radius),
            0.0,
            std::f64::consts::TAU,
        );
        if arc.is_ok() {
            self.ctx.fill();
        }
    }

    fn fill_text(&mut self, text: &str, at: Vec2, size: f32, color: Rgba) {
        self.fill_style(color);
        self.ctx.set_font(&format!("{size}px monospace"));
        if let Err(e) = self.ctx.fill_text(text, f64::from(at.x), f64::from(at.y)) {
            log::debug!("overlay text failed: {e:?}");
        }
    }
}
