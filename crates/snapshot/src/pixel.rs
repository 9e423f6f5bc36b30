//! CPU rendering of a field into an RGBA8 buffer.
//!
//! Always available (no feature gate) so that both the `png` snapshot path
//! and any in-memory consumer share the same conversion.

use cliffray_core::camera::{CameraState, MatrixCache};
use cliffray_core::field::MultivectorField;
use cliffray_core::state::RenderingParameters;
use cliffray_core::trace::render_pixel;
use glam::Vec2;

/// Traces every pixel through the reference tracer.
///
/// Rows run top to bottom, so row 0 is NDC `y = +1`. Pixels are sampled at
/// their centers. Alpha is always 255. The buffer length is
/// `width * height * 4`.
pub fn trace_to_rgba(
    field: &MultivectorField,
    camera: &CameraState,
    rendering: &RenderingParameters,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let matrices = MatrixCache::new().matrices(camera);
    let (w, h) = (width as f32, height as f32);

    let mut buf = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let ndc = Vec2::new(
                (x as f32 + 0.5) / w * 2.0 - 1.0,
                1.0 - (y as f32 + 0.5) / h * 2.0,
            );
            let rgb = render_pixel(field, camera, &matrices, rendering, ndc);
            buf.extend_from_slice(&[to_byte(rgb.x), to_byte(rgb.y), to_byte(rgb.z), 255]);
        }
    }
    buf
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
