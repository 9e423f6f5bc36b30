//! Packing a [`MultivectorField`] into the 4x1 RGBA field texture.
//!
//! Texel `i` holds components `4i..4i+4`. With float texture support the
//! components are uploaded verbatim; otherwise each is quantized to a byte
//! with `clamp(floor((v + 10) * 12.75), 0, 255)`, which maps [-10, 10] onto
//! [0, 255]. Values outside [-10, 10] saturate, they never wrap. The shader
//! undoes the byte mapping with `texel * 20 - 10`.

use serde::{Deserialize, Serialize};

use crate::field::{MultivectorField, FIELD_COMPONENTS};

/// Field texture width in texels.
pub const TEXTURE_WIDTH: u32 = 4;
/// Field texture height in texels.
pub const TEXTURE_HEIGHT: u32 = 1;
/// Lower bound of the byte-encodable range.
pub const QUANT_MIN: f32 = -10.0;
/// Upper bound of the byte-encodable range.
pub const QUANT_MAX: f32 = 10.0;
/// Bytes per unit of field value.
pub const QUANT_SCALE: f32 = 12.75;

/// How field components are stored in the texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureEncoding {
    /// 32-bit float texels, lossless.
    #[default]
    Float32,
    /// Unsigned byte texels, lossy and clamped to [-10, 10].
    QuantizedU8,
}

impl TextureEncoding {
    /// Picks float storage when the context can sample float textures.
    pub fn for_capability(supports_float_textures: bool) -> Self {
        if supports_float_textures {
            TextureEncoding::Float32
        } else {
            TextureEncoding::QuantizedU8
        }
    }

    /// Packs a field for upload.
    pub fn encode(self, field: &MultivectorField) -> TexelPayload {
        match self {
            TextureEncoding::Float32 => TexelPayload::Float(*field.components()),
            TextureEncoding::QuantizedU8 => TexelPayload::Bytes(field.components().map(quantize)),
        }
    }

    /// GLSL statement that turns a sampled `texel` into field values.
    pub(crate) fn glsl_decode(self) -> &'static str {
        match self {
            TextureEncoding::Float32 => "return texel;",
            TextureEncoding::QuantizedU8 => "return texel * 20.0 - 10.0;",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureEncoding::Float32 => "float32",
            TextureEncoding::QuantizedU8 => "quantized_u8",
        }
    }
}

/// Texel data ready for `tex_image_2d` / `tex_sub_image_2d`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TexelPayload {
    Float([f32; FIELD_COMPONENTS]),
    Bytes([u8; FIELD_COMPONENTS]),
}

impl TexelPayload {
    pub fn encoding(&self) -> TextureEncoding {
        match self {
            TexelPayload::Float(_) => TextureEncoding::Float32,
            TexelPayload::Bytes(_) => TextureEncoding::QuantizedU8,
        }
    }

    /// Raw bytes in native endianness, as WebGL expects.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            TexelPayload::Float(values) => values.iter().flat_map(|v| v.to_ne_bytes()).collect(),
            TexelPayload::Bytes(bytes) => bytes.to_vec(),
        }
    }

    /// Field values as the shader will see them after decoding.
    pub fn decoded(&self) -> MultivectorField {
        match self {
            TexelPayload::Float(values) => MultivectorField::new(*values),
            TexelPayload::Bytes(bytes) => MultivectorField::new(bytes.map(dequantize)),
        }
    }
}

/// Maps a field value to a byte, saturating outside [-10, 10]. NaN maps to 0.
pub fn quantize(value: f32) -> u8 {
    let scaled = ((value - QUANT_MIN) * QUANT_SCALE).floor();
    // `as` saturates and sends NaN to 0.
    scaled.clamp(0.0, 255.0) as u8
}

/// Inverse of [`quantize`] up to one quantization step (1/12.75).
pub fn dequantize(byte: u8) -> f32 {
    f32::from(byte) / 255.0 * (QUANT_MAX - QUANT_MIN) + QUANT_MIN
}

/// Horizontal texture coordinate of texel `index`'s centre.
pub fn texel_center(index: u32) -> f32 {
    (index as f32 + 0.5) / TEXTURE_WIDTH as f32
}
