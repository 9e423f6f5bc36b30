#![deny(unsafe_code)]
//! Field presets and CPU-side snapshot rendering.
//!
//! This crate sits between `cliffray-core` (field, camera and reference
//! tracer) and the front ends. The CLI and WASM bindings both resolve preset
//! names here to avoid duplicating dispatch logic.

pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

use cliffray_core::error::RenderError;
use cliffray_core::field::MultivectorField;
use cliffray_core::field_source::{EchoDecay, FieldSource, SheafBranches, ZxOrbit};

/// All available preset names.
const PRESET_NAMES: &[&str] = &["zero", "scalar", "zx", "sheaf", "echo"];

/// Named field configurations for snapshots and previews.
///
/// Use [`FieldPreset::from_name`] for string-based construction (CLI, WASM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPreset {
    /// All components zero.
    Zero,
    /// Unit scalar only.
    Scalar,
    /// Animated orbit over scalar, e1 and one bivector.
    Zx,
    /// Four-branch oscillation.
    Sheaf,
    /// Damped oscillation.
    Echo,
}

impl FieldPreset {
    /// Looks a preset up by name.
    ///
    /// # Errors
    ///
    /// `RenderError::UnknownPreset` if the name is not recognized.
    pub fn from_name(name: &str) -> Result<Self, RenderError> {
        match name {
            "zero" => Ok(FieldPreset::Zero),
            "scalar" => Ok(FieldPreset::Scalar),
            "zx" => Ok(FieldPreset::Zx),
            "sheaf" => Ok(FieldPreset::Sheaf),
            "echo" => Ok(FieldPreset::Echo),
            _ => Err(RenderError::UnknownPreset(name.to_string())),
        }
    }

    /// Returns a slice of all recognized preset names.
    pub fn list_presets() -> &'static [&'static str] {
        PRESET_NAMES
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldPreset::Zero => "zero",
            FieldPreset::Scalar => "scalar",
            FieldPreset::Zx => "zx",
            FieldPreset::Sheaf => "sheaf",
            FieldPreset::Echo => "echo",
        }
    }

    /// The preset's field at animation frame `frame`. Static presets ignore it.
    pub fn field(self, frame: u64) -> MultivectorField {
        match self {
            FieldPreset::Zero => MultivectorField::zeros(),
            FieldPreset::Scalar => MultivectorField::zeros().with(0, 1.0),
            FieldPreset::Zx => ZxOrbit.sample(frame),
            FieldPreset::Sheaf => SheafBranches.sample(frame),
            FieldPreset::Echo => EchoDecay.sample(frame),
        }
    }
}
