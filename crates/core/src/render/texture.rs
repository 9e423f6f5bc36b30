//! The 4x1 field texture.
//!
//! Created once from the first field and then updated in place with a
//! sub-image upload every frame; the handle never changes for the life of a
//! [`FieldTexture`]. Switching encodings requires destroying and recreating
//! it.

use crate::encoding::TextureEncoding;
use crate::error::RenderError;
use crate::field::MultivectorField;

use super::backend::GlBackend;

/// Upload statistics are logged once per this many uploads.
pub const UPLOAD_LOG_INTERVAL: u64 = 1000;

/// Handle plus encoding of the live field texture.
#[derive(Debug)]
pub struct FieldTexture<T> {
    handle: T,
    encoding: TextureEncoding,
    uploads: u64,
}

impl<T: Copy> FieldTexture<T> {
    /// Allocates the texture with `field` as its initial contents.
    ///
    /// # Errors
    ///
    /// `RenderError::Gpu` if the driver cannot create the texture.
    pub fn create<B>(
        backend: &B,
        encoding: TextureEncoding,
        field: &MultivectorField,
    ) -> Result<Self, RenderError>
    where
        B: GlBackend<Texture = T>,
    {
        let handle = backend
            .create_field_texture(&encoding.encode(field))
            .map_err(|e| RenderError::Gpu(format!("field texture: {e}")))?;
        log::debug!("created {} field texture", encoding.name());
        Ok(Self {
            handle,
            encoding,
            uploads: 1,
        })
    }

    /// Replaces the texels in place.
    pub fn update<B>(&mut self, backend: &B, field: &MultivectorField)
    where
        B: GlBackend<Texture = T>,
    {
        backend.update_field_texture(self.handle, &self.encoding.encode(field));
        self.uploads += 1;

        if self.uploads % UPLOAD_LOG_INTERVAL == 0 {
            log::debug!(
                "field texture: {} uploads ({}), {} non-zero components, max |c| {:.3}",
                self.uploads,
                self.encoding.name(),
                field.non_zero_count(),
                field.max_abs()
            );
        }
    }

    pub fn handle(&self) -> T {
        self.handle
    }

    pub fn encoding(&self) -> TextureEncoding {
        self.encoding
    }

    /// Uploads so far, including the initial one.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn destroy<B>(self, backend: &B)
    where
        B: GlBackend<Texture = T>,
    {
        backend.delete_texture(self.handle);
    }
}
