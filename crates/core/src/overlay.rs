//! 2D overlays drawn above the raymarched field.
//!
//! Drawing goes through [`OverlaySurface`], a tiny subset of the canvas 2D
//! API, so the same overlay code drives a browser canvas and the recording
//! surface used in tests. Each [`ViewMode`] other than `Clifford` maps to one
//! static [`OverlayStrategy`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::graph::{GraphSnapshot, NodeKind};
use crate::view_mode::ViewMode;

/// Straight-alpha color with 8-bit channels, as CSS `rgba()` takes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// CSS color string, e.g. `rgba(100, 150, 200, 0.3)`.
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Drawing operations an overlay needs. Coordinates are CSS pixels with the
/// origin at the top left.
pub trait OverlaySurface {
    /// Resizes the backing store; also clears it.
    fn resize(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);
    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba);
    /// Draws monospace text with its baseline at `at`.
    fn fill_text(&mut self, text: &str, at: Vec2, size_px: f32, color: Rgba);
}

/// Scalar metrics shown by the metrics overlay and driving the metric field
/// generator. Missing keys default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayMetrics {
    /// Overall activity, 0..1.
    pub level: f32,
    /// Growth pressure, 0..1.
    pub drive: f32,
    /// Internal tension; drawn scaled by 1/10.
    pub strain: f32,
    /// Overall field magnitude; drawn scaled by 1/100.
    pub magnitude: f32,
    /// Count of recent discrete events.
    pub events: u32,
}

/// Everything an overlay may read for one frame.
#[derive(Debug, Clone, Copy)]
pub struct OverlayInput<'a> {
    pub graph: Option<&'a GraphSnapshot>,
    pub metrics: Option<&'a OverlayMetrics>,
    pub audio_coherence: f32,
    pub width: f32,
    pub height: f32,
}

/// One view's overlay drawing routine.
pub trait OverlayStrategy: Sync {
    fn draw(&self, surface: &mut dyn OverlaySurface, input: &OverlayInput<'_>);
}

const TEXT_BRIGHT: Rgba = Rgba::new(255, 255, 255, 0.9);
const TEXT_DIM: Rgba = Rgba::new(255, 255, 255, 0.7);
const EDGE_COLOR: Rgba = Rgba::new(100, 150, 200, 0.3);
const NODE_RADIUS: f32 = 8.0;

/// Circular graph layout with kind-colored nodes and a size caption.
#[derive(Debug)]
pub struct GraphOverlay;

impl GraphOverlay {
    pub fn node_color(kind: NodeKind) -> Rgba {
        match kind {
            NodeKind::Z => Rgba::new(100, 255, 100, 0.8),
            NodeKind::X => Rgba::new(255, 100, 100, 0.8),
            NodeKind::Other => Rgba::new(200, 200, 200, 0.8),
        }
    }

    pub fn caption(graph: &GraphSnapshot) -> String {
        format!(
            "Graph: {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        )
    }
}

impl OverlayStrategy for GraphOverlay {
    fn draw(&self, surface: &mut dyn OverlaySurface, input: &OverlayInput<'_>) {
        surface.clear();
        let Some(graph) = input.graph else {
            return;
        };

        let positions = graph.circular_layout(input.width, input.height);

        // Edges to unknown nodes are skipped.
        for edge in &graph.edges {
            let (from, to) = edge.endpoints();
            if let (Some(&a), Some(&b)) = (positions.get(from), positions.get(to)) {
                surface.stroke_line(a, b, 1.0, EDGE_COLOR);
            }
        }

        for node in &graph.nodes {
            let Some(&pos) = positions.get(node) else {
                continue;
            };
            surface.fill_circle(pos, NODE_RADIUS, Self::node_color(graph.kind(node)));
            surface.fill_text(
                graph.kind_name(node),
                pos + Vec2::new(-4.0, 3.0),
                10.0,
                TEXT_BRIGHT,
            );
        }

        surface.fill_text(&Self::caption(graph), Vec2::new(10.0, 20.0), 12.0, TEXT_DIM);
    }
}

/// Four horizontal metric bars on a translucent panel.
#[derive(Debug)]
pub struct MetricsOverlay;

const BAR_X: f32 = 20.0;
const BAR_Y: f32 = 40.0;
const BAR_WIDTH: f32 = 200.0;
const BAR_HEIGHT: f32 = 20.0;
const BAR_PITCH: f32 = 30.0;

/// A single bar: fill fraction in [0, 1], label and color.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBar {
    pub fraction: f32,
    pub label: String,
    pub color: Rgba,
}

impl MetricsOverlay {
    /// Bars in drawing order: level, drive, strain, magnitude, then audio
    /// coherence.
    pub fn bars(metrics: &OverlayMetrics, audio_coherence: f32) -> Vec<MetricBar> {
        vec![
            MetricBar {
                fraction: unit(metrics.level),
                label: format!("Level: {:.1}%", metrics.level * 100.0),
                color: Rgba::new(100, 100, 255, 1.0),
            },
            MetricBar {
                fraction: unit(metrics.drive),
                label: format!("Drive: {:.1}%", metrics.drive * 100.0),
                color: Rgba::new(100, 255, 100, 1.0),
            },
            MetricBar {
                fraction: unit(metrics.strain / 10.0),
                label: format!("Strain: {:.2}", metrics.strain),
                color: Rgba::new(255, 100, 100, 1.0),
            },
            MetricBar {
                fraction: unit(metrics.magnitude / 100.0),
                label: format!("Magnitude: {:.1}", metrics.magnitude),
                color: Rgba::new(255, 215, 0, 1.0),
            },
            MetricBar {
                fraction: unit(audio_coherence),
                label: format!("Audio: {:.2}", audio_coherence),
                color: Rgba::new(200, 120, 255, 1.0),
            },
        ]
    }
}

/// Clamps to [0, 1]; NaN draws as an empty bar.
fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl OverlayStrategy for MetricsOverlay {
    fn draw(&self, surface: &mut dyn OverlaySurface, input: &OverlayInput<'_>) {
        surface.clear();
        let metrics = input.metrics.copied().unwrap_or_default();
        let bars = Self::bars(&metrics, input.audio_coherence);

        let panel_height = BAR_Y - 25.0 + BAR_PITCH * bars.len() as f32;
        surface.fill_rect(15.0, 15.0, 210.0, panel_height, Rgba::new(0, 0, 0, 0.5));
        surface.fill_text("Field Metrics", Vec2::new(BAR_X, BAR_Y - 10.0), 14.0, TEXT_BRIGHT);

        for (i, bar) in bars.iter().enumerate() {
            let y = BAR_Y + BAR_PITCH * i as f32;
            surface.fill_rect(BAR_X, y, BAR_WIDTH, BAR_HEIGHT, bar.color.with_alpha(0.3));
            surface.fill_rect(
                BAR_X,
                y,
                BAR_WIDTH * bar.fraction,
                BAR_HEIGHT,
                bar.color.with_alpha(0.9),
            );
            surface.fill_text(
                &bar.label,
                Vec2::new(BAR_X + BAR_WIDTH + 10.0, y + 14.0),
                11.0,
                TEXT_BRIGHT,
            );
        }
    }
}

/// Title and subtitle placeholder.
#[derive(Debug)]
pub struct CaptionOverlay {
    pub title: &'static str,
    pub subtitle: &'static str,
}

impl OverlayStrategy for CaptionOverlay {
    fn draw(&self, surface: &mut dyn OverlaySurface, _input: &OverlayInput<'_>) {
        surface.clear();
        surface.fill_text(self.title, Vec2::new(20.0, 30.0), 16.0, TEXT_BRIGHT);
        surface.fill_text(self.subtitle, Vec2::new(20.0, 50.0), 12.0, TEXT_DIM);
    }
}

static GRAPH_OVERLAY: GraphOverlay = GraphOverlay;
static METRICS_OVERLAY: MetricsOverlay = MetricsOverlay;
static SHEAF_OVERLAY: CaptionOverlay = CaptionOverlay {
    title: "Sheaf Tree View",
    subtitle: "(Category structure visualization - in development)",
};
static ECHO_OVERLAY: CaptionOverlay = CaptionOverlay {
    title: "Echo Map View",
    subtitle: "(Temporal evolution visualization - in development)",
};

impl ViewMode {
    /// Overlay drawn on top of the field in this mode, if any.
    pub fn overlay(self) -> Option<&'static dyn OverlayStrategy> {
        match self {
            ViewMode::Clifford => None,
            ViewMode::Zx => Some(&GRAPH_OVERLAY),
            ViewMode::Consciousness => Some(&METRICS_OVERLAY),
            ViewMode::Sheaf => Some(&SHEAF_OVERLAY),
            ViewMode::Echo => Some(&ECHO_OVERLAY),
        }
    }
}
