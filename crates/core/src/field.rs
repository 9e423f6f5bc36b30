//! The 16-component multivector field fed to the raymarch shader.
//!
//! A `MultivectorField` is a fixed-size bag of `f32` values consumed strictly
//! by position. Component meaning is a rendering convention: slot 0 is read as
//! the scalar, slots 1..=3 as vectors, 4..=10 as bivectors, 11..=14 as
//! trivectors and slot 15 as the pseudoscalar. Any finite or non-finite value
//! is accepted.

use std::ops::Index;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RenderError;

/// Number of components in every field snapshot.
pub const FIELD_COMPONENTS: usize = 16;

/// A 16-component field snapshot.
///
/// Serializes as a bare JSON array. Deserializes from a bare array,
/// `{"components": [...]}` or `{"payload": {"components": [...]}}`; any
/// length other than 16 is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct MultivectorField {
    components: [f32; FIELD_COMPONENTS],
}

/// Summed absolute component magnitudes per grade slice.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradeStrengths {
    pub scalar: f32,
    pub vector: f32,
    pub bivector: f32,
    pub trivector: f32,
    pub pseudoscalar: f32,
}

impl GradeStrengths {
    /// Sum of all five grade strengths.
    pub fn total(&self) -> f32 {
        self.scalar + self.vector + self.bivector + self.trivector + self.pseudoscalar
    }
}

impl MultivectorField {
    /// Wraps 16 components.
    pub fn new(components: [f32; FIELD_COMPONENTS]) -> Self {
        Self { components }
    }

    /// A field with every component set to zero.
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Copies components from a slice.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Configuration` if the slice length is not 16.
    pub fn from_slice(values: &[f32]) -> Result<Self, RenderError> {
        let components: [f32; FIELD_COMPONENTS] = values.try_into().map_err(|_| {
            RenderError::Configuration(format!(
                "field must have {FIELD_COMPONENTS} components, got {}",
                values.len()
            ))
        })?;
        Ok(Self { components })
    }

    /// Read-only access to all components.
    pub fn components(&self) -> &[f32; FIELD_COMPONENTS] {
        &self.components
    }

    /// Sets a component. Indices outside 0..16 are ignored.
    pub fn set(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.components.get_mut(index) {
            *slot = value;
        }
    }

    /// Builder-style variant of [`MultivectorField::set`].
    pub fn with(mut self, index: usize, value: f32) -> Self {
        self.set(index, value);
        self
    }

    /// The four RGBA texels the field occupies in the 4x1 texture.
    pub fn texels(&self) -> [[f32; 4]; 4] {
        let c = &self.components;
        [
            [c[0], c[1], c[2], c[3]],
            [c[4], c[5], c[6], c[7]],
            [c[8], c[9], c[10], c[11]],
            [c[12], c[13], c[14], c[15]],
        ]
    }

    /// Per-grade L1 magnitudes, using the slot convention of hit coloring.
    pub fn grade_strengths(&self) -> GradeStrengths {
        let c = &self.components;
        let sum_abs = |range: std::ops::RangeInclusive<usize>| -> f32 {
            c[range].iter().map(|v| v.abs()).sum()
        };
        GradeStrengths {
            scalar: c[0].abs(),
            vector: sum_abs(1..=3),
            bivector: sum_abs(4..=10),
            trivector: sum_abs(11..=14),
            pseudoscalar: c[15].abs(),
        }
    }

    /// Sum of absolute values of all components.
    pub fn l1_norm(&self) -> f32 {
        self.components.iter().map(|v| v.abs()).sum()
    }

    /// Euclidean distance between two snapshots.
    pub fn delta_norm(&self, previous: &MultivectorField) -> f32 {
        self.components
            .iter()
            .zip(previous.components.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }

    /// Number of components whose magnitude exceeds `1e-6`.
    pub fn non_zero_count(&self) -> usize {
        self.components.iter().filter(|v| v.abs() > 1e-6).count()
    }

    /// Largest absolute component value.
    pub fn max_abs(&self) -> f32 {
        self.components.iter().fold(0.0_f32, |m, v| m.max(v.abs()))
    }
}

impl Index<usize> for MultivectorField {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.components[index]
    }
}

impl From<[f32; FIELD_COMPONENTS]> for MultivectorField {
    fn from(components: [f32; FIELD_COMPONENTS]) -> Self {
        Self::new(components)
    }
}

#[derive(Deserialize)]
struct Payload {
    components: [f32; FIELD_COMPONENTS],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldRepr {
    Bare([f32; FIELD_COMPONENTS]),
    Flat { components: [f32; FIELD_COMPONENTS] },
    Wrapped { payload: Payload },
}

impl<'de> Deserialize<'de> for MultivectorField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let components = match FieldRepr::deserialize(deserializer)? {
            FieldRepr::Bare(components) | FieldRepr::Flat { components } => components,
            FieldRepr::Wrapped { payload } => payload.components,
        };
        Ok(Self { components })
    }
}
