//! CPU mirror of the fragment shader's field distance function.
//!
//! The function is a fixed closed-form blend of the 16 field components and
//! the sample position. It is not 1-Lipschitz, so the tracer only steps a
//! fraction of the returned value. Keep the constants here in lockstep with
//! `FIELD_DISTANCE_GLSL` in the pipeline module.

use glam::Vec3;

use crate::field::MultivectorField;

/// Golden ratio, used as a modulation frequency.
const PHI: f32 = 1.618_034;
/// Restoration strength applied against field incoherence.
const RESTORATION: f32 = 0.382;
/// Pi as written in the shader.
const SHADER_PI: f32 = 3.14159;

/// Named views of the 16 components, in shader slot order.
#[derive(Debug, Clone, Copy)]
struct Slots {
    scalar: f32,
    vectors: Vec3,
    bivectors1: Vec3,
    bivector_e12: f32,
    bivectors2: Vec3,
    trivector_e013: f32,
    trivectors1: Vec3,
    pseudoscalar: f32,
}

impl Slots {
    fn of(field: &MultivectorField) -> Self {
        let c = field.components();
        Self {
            scalar: c[0],
            vectors: Vec3::new(c[1], c[2], c[3]),
            bivectors1: Vec3::new(c[4], c[5], c[6]),
            bivector_e12: c[7],
            bivectors2: Vec3::new(c[8], c[9], c[10]),
            trivector_e013: c[11],
            trivectors1: Vec3::new(c[12], c[13], c[14]),
            pseudoscalar: c[15],
        }
    }

    fn component_complexity(&self) -> f32 {
        self.scalar.abs() * 0.1
            + l1(self.vectors) * 0.08
            + l1(self.bivectors1) * 0.06
            + self.bivector_e12.abs() * 0.05
            + l1(self.bivectors2) * 0.04
            + self.trivector_e013.abs() * 0.03
            + l1(self.trivectors1) * 0.025
            + self.pseudoscalar.abs() * 0.01
    }
}

fn l1(v: Vec3) -> f32 {
    v.x.abs() + v.y.abs() + v.z.abs()
}

/// Evaluates the field distance at `pos`.
///
/// Deterministic for a given field and position; the all-zero field yields
/// exactly `0.0` everywhere.
pub fn field_distance(field: &MultivectorField, pos: Vec3) -> f32 {
    let s = Slots::of(field);
    let coherence = field.l1_norm();

    let scale1 = (pos.x + pos.y + pos.z) * 0.1;
    let scale2 = (pos.x * pos.y + pos.y * pos.z + pos.z * pos.x) * 0.5;
    let scale3 = (pos.x * pos.y * pos.z) * 2.0;

    let layer1 = s.scalar * scale1.cos()
        + s.vectors.dot(pos) * scale1.sin()
        + (s.bivectors1.x * pos.x * pos.y
            + s.bivectors1.y * pos.y * pos.z
            + s.bivectors1.z * pos.z * pos.x)
            * (scale1 * 1.618).cos();

    let layer2 = s.bivectors2.dot(pos) * scale2.sin()
        + s.trivector_e013 * (pos.x * scale2).cos()
        + s.trivectors1.x * (pos.y * scale2).sin()
        + s.trivectors1.y * (pos.z * scale2).cos();

    let layer3 = s.pseudoscalar * scale3.sin()
        + s.trivectors1.z * (scale3 * 0.618).cos()
        + s.bivector_e12 * (pos.x * pos.y * scale3).sin();

    let interference1 = layer1 * layer2;
    let interference2 = layer2 * layer3;
    let interference3 = layer3 * layer1;

    let weight = coherence / 16.0;
    let blended = layer1 * (0.3 + weight * 0.2)
        + layer2 * (0.2 + weight * 0.3)
        + layer3 * (0.1 + weight * 0.4)
        + interference1 * (0.05 + weight * 0.1)
        + interference2 * (0.03 + weight * 0.15)
        + interference3 * (0.02 + weight * 0.2);

    let complexity = s.component_complexity();

    let coupling = s.scalar * s.vectors.dot(pos) * 0.01
        + s.vectors.dot(s.bivectors1) * scale2.sin() * 0.02
        + s.trivector_e013 * s.trivectors1.x * scale3.cos() * 0.01
        + s.bivectors1.x * pos.y * pos.z * scale1.sin() * 0.03
        + s.bivectors1.y * pos.z * pos.x * scale2.cos() * 0.03
        + s.bivectors1.z * pos.x * pos.y * scale3.sin() * 0.03
        + s.vectors.x * s.bivectors2.y * pos.z * 0.02
        + s.vectors.y * s.bivectors2.z * pos.x * 0.02
        + s.vectors.z * s.bivectors2.x * pos.y * 0.02
        + s.trivector_e013 * s.bivectors2.x * scale1.sin() * 0.015
        + s.trivectors1.x * s.trivectors1.y * scale2.cos() * 0.015
        + s.trivectors1.z * s.pseudoscalar * scale3.sin() * 0.01;

    let incoherence = blended.abs() / complexity.max(0.01);
    let restoration = 1.0 - RESTORATION * incoherence / (1.0 + incoherence);
    let mut distance = blended * restoration;

    let mut coupled = coupling;
    coupled += coupling * coupling * (weight * PHI * SHADER_PI).sin() * 0.1;
    coupled += coupling * coupling * coupling * (weight * PHI * PHI * SHADER_PI).cos() * 0.01;
    coupled += (coupling * complexity).sin() * (weight * PHI * PHI * PHI * SHADER_PI).sin() * 0.05;

    distance += coupled + complexity * coherence.sin();

    let folded = distance.abs();
    let asymmetry =
        (pos.x * 0.5).sin() * (pos.y * 0.3).cos() * (pos.z * 0.7).sin() * complexity * 0.1;

    folded * (0.1 + coherence * 0.05) + asymmetry
}

/// Estimates the surface normal by central differences with step `0.01`.
///
/// Returns `Vec3::ZERO` where the gradient vanishes (the shader's
/// `normalize` is undefined there).
pub fn estimate_normal(field: &MultivectorField, pos: Vec3) -> Vec3 {
    const EPS: f32 = 0.01;
    let d = |offset: Vec3| field_distance(field, pos + offset) - field_distance(field, pos - offset);
    Vec3::new(
        d(Vec3::new(EPS, 0.0, 0.0)),
        d(Vec3::new(0.0, EPS, 0.0)),
        d(Vec3::new(0.0, 0.0, EPS)),
    )
    .normalize_or_zero()
}
