//! Context acquisition and capability detection.
//!
//! A [`ContextSource`] hands out backends for a particular canvas. The
//! runtime asks for WebGL2 first and falls back to WebGL1; which extension
//! signals float texture support depends on the version.

use std::fmt;

use super::backend::GlBackend;

/// Which WebGL flavor a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextVersion {
    WebGl2,
    WebGl1,
}

impl ContextVersion {
    pub fn name(self) -> &'static str {
        match self {
            ContextVersion::WebGl2 => "webgl2",
            ContextVersion::WebGl1 => "webgl",
        }
    }

    /// Extension whose presence enables float field textures.
    ///
    /// WebGL2 samples float textures natively but the field is only usable
    /// as `RGBA32F` alongside `EXT_color_buffer_float`; WebGL1 needs
    /// `OES_texture_float` to upload `FLOAT` texels at all.
    pub fn float_texture_extension(self) -> &'static str {
        match self {
            ContextVersion::WebGl2 => "EXT_color_buffer_float",
            ContextVersion::WebGl1 => "OES_texture_float",
        }
    }
}

impl fmt::Display for ContextVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that can produce a GL backend, e.g. a canvas element.
pub trait ContextSource {
    type Backend: GlBackend;

    /// A WebGL2 backend, or `None` if unavailable.
    fn webgl2(&self) -> Option<Self::Backend>;
    /// A WebGL1 backend, or `None` if unavailable.
    fn webgl1(&self) -> Option<Self::Backend>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_canvas_context_ids() {
        assert_eq!(ContextVersion::WebGl2.to_string(), "webgl2");
        assert_eq!(ContextVersion::WebGl1.name(), "webgl");
    }

    #[test]
    fn float_extension_depends_on_version() {
        assert_eq!(
            ContextVersion::WebGl2.float_texture_extension(),
            "EXT_color_buffer_float"
        );
        assert_eq!(
            ContextVersion::WebGl1.float_texture_extension(),
            "OES_texture_float"
        );
    }
}
