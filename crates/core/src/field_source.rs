//! Field sources: deterministic multivector field generators.
//!
//! A [`FieldSource`] produces a full [`MultivectorField`] for a frame index.
//! The built-in sources animate a few components with sines and cosines of
//! `frame * rate`; they stand in for a host-supplied field in previews and
//! CLI presets. Each view uses exactly one source.
//!
//! All implementations are deterministic: same frame, same field.

use crate::field::MultivectorField;
use crate::overlay::OverlayMetrics;
use crate::view_mode::ViewMode;

/// A source of multivector fields keyed by frame index.
pub trait FieldSource: Send + Sync {
    /// The field for `frame`.
    fn sample(&self, frame: u64) -> MultivectorField;
}

/// Three-component orbit used by the graph view.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZxOrbit;

/// Four-component branching pattern used by the sheaf view.
#[derive(Debug, Clone, Copy, Default)]
pub struct SheafBranches;

/// Exponentially decaying oscillation used by the echo view.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoDecay;

/// Field driven by overlay metrics. Each metric switches on its own group of
/// components only above a threshold, so all-zero metrics give a zero field.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricDriven {
    pub metrics: OverlayMetrics,
}

/// Frame index scaled to animation time. Precision loss past 2^24 frames is
/// irrelevant at 60 fps.
fn time(frame: u64, rate: f32) -> f32 {
    frame as f32 * rate
}

impl FieldSource for ZxOrbit {
    fn sample(&self, frame: u64) -> MultivectorField {
        let t = time(frame, 0.02);
        MultivectorField::zeros()
            .with(0, 3.0 * t.sin())
            .with(1, 2.0 * (t * 1.1).cos())
            .with(5, 1.5 * (t * 0.8).sin())
    }
}

impl FieldSource for SheafBranches {
    fn sample(&self, frame: u64) -> MultivectorField {
        let t = time(frame, 0.015);
        MultivectorField::zeros()
            .with(0, 2.0 * t.cos())
            .with(2, 1.8 * (t * 2.0).sin())
            .with(4, 1.5 * (t * 3.0).cos())
            .with(8, 1.2 * (t * 1.5).sin())
    }
}

impl FieldSource for EchoDecay {
    fn sample(&self, frame: u64) -> MultivectorField {
        let t = time(frame, 0.01);
        let envelope = (-0.1 * t).exp();
        MultivectorField::zeros()
            .with(0, 2.5 * envelope * (t * 4.0).cos())
            .with(3, 2.0 * envelope * (t * 3.0).sin())
            .with(7, 1.5 * envelope * (t * 2.0).cos())
    }
}

impl FieldSource for MetricDriven {
    fn sample(&self, frame: u64) -> MultivectorField {
        let t = time(frame, 0.01);
        let m = &self.metrics;
        let mut field = MultivectorField::zeros();

        if m.level > 0.0 {
            field.set(0, 2.0 * (1.0 + m.level * 3.0) * t.cos());
        }
        if m.drive > 0.0 {
            field.set(1, 2.0 * m.drive * (t * 1.2).sin());
            field.set(2, 1.8 * m.drive * (t * 0.8).cos());
            field.set(3, 1.5 * m.drive * (t * 1.5).sin());
        }
        if m.strain > 0.1 {
            field.set(5, 2.5 * m.strain * (t * 2.0).sin());
            field.set(6, 2.0 * m.strain * (t * 2.5).cos());
            field.set(7, 1.8 * m.strain * (t * 3.0).sin());
        }
        if m.events > 0 {
            let strength = (m.events as f32 * 0.5).min(3.0);
            field.set(11, strength * (t * 4.0).sin());
            field.set(12, strength * (t * 3.5).cos());
            field.set(15, strength * 0.5 * (t * 5.0).sin());
        }
        field
    }
}

/// Generator standing in for a missing host field in `view`.
///
/// `Clifford` has none: the host must supply the field. The metric-driven
/// source reads `metrics`, defaulting to all zeros.
pub fn fallback_source(
    view: ViewMode,
    metrics: Option<&OverlayMetrics>,
) -> Option<Box<dyn FieldSource>> {
    match view {
        ViewMode::Clifford => None,
        ViewMode::Zx => Some(Box::new(ZxOrbit)),
        ViewMode::Sheaf => Some(Box::new(SheafBranches)),
        ViewMode::Echo => Some(Box::new(EchoDecay)),
        ViewMode::Consciousness => Some(Box::new(MetricDriven {
            metrics: metrics.copied().unwrap_or_default(),
        })),
    }
}
