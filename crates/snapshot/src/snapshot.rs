//! CPU-side PNG rendering of a field.
//!
//! This module is feature-gated behind `png` (default on) so that consumers
//! without a filesystem can depend on the crate without pulling in `image`.
//! The pixel buffer itself comes from [`crate::pixel`].

use std::path::Path;

use cliffray_core::camera::CameraState;
use cliffray_core::error::RenderError;
use cliffray_core::field::MultivectorField;
use cliffray_core::state::RenderingParameters;

use crate::pixel::trace_to_rgba;

/// Raytraces `field` at `width` x `height` and writes it as a PNG.
///
/// # Errors
///
/// `RenderError::Configuration` for a zero-sized image, `RenderError::Io`
/// if the file cannot be written.
pub fn write_png(
    field: &MultivectorField,
    camera: &CameraState,
    rendering: &RenderingParameters,
    (width, height): (u32, u32),
    path: &Path,
) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::Configuration(format!(
            "image size must be non-zero, got {width}x{height}"
        )));
    }
    let rgba = trace_to_rgba(field, camera, rendering, width, height);
    let img = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| RenderError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| RenderError::Io(e.to_string()))?;
    log::info!("wrote {width}x{height} snapshot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_png_round_trip() {
        let field = MultivectorField::zeros().with(0, 1.0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.png");

        write_png(
            &field,
            &CameraState::default(),
            &RenderingParameters::default(),
            (16, 12),
            &path,
        )
        .unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.width(), 16);
        assert_eq!(img.height(), 12);
    }

    #[test]
    fn zero_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_png(
            &MultivectorField::zeros(),
            &CameraState::default(),
            &RenderingParameters::default(),
            (0, 4),
            &dir.path().join("empty.png"),
        );
        assert!(matches!(result, Err(RenderError::Configuration(_))));
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("field.png");
        let result = write_png(
            &MultivectorField::zeros(),
            &CameraState::default(),
            &RenderingParameters::default(),
            (2, 2),
            &path,
        );
        assert!(matches!(result, Err(RenderError::Io(_))));
    }
}
