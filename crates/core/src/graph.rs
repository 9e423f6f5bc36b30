//! Graph snapshots consumed by the graph overlay.
//!
//! The host supplies `{ nodes, edges, labels }`. Node ids are opaque and may be
//! integers or strings; edges may be `[from, to]` pairs or `{from, to}`
//! objects. Labels are keyed by the node id's string form.

use std::collections::HashMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Text(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(id) => write!(f, "{id}"),
            NodeId::Text(id) => f.write_str(id),
        }
    }
}

/// An undirected edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Edge {
    Pair([NodeId; 2]),
    Object { from: NodeId, to: NodeId },
}

impl Edge {
    /// Both endpoints, in declaration order.
    pub fn endpoints(&self) -> (&NodeId, &NodeId) {
        match self {
            Edge::Pair([from, to]) => (from, to),
            Edge::Object { from, to } => (from, to),
        }
    }
}

/// Node kind as drawn by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Z,
    X,
    Other,
}

/// Per-node annotation. Phases are `numer / denom` multiples of pi; hosts
/// may send them as integers or floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLabel {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub phase_numer: f64,
    #[serde(default = "default_denom")]
    pub phase_denom: f64,
}

fn default_kind() -> String {
    "Z".to_owned()
}

fn default_denom() -> f64 {
    1.0
}

impl NodeLabel {
    pub fn node_kind(&self) -> NodeKind {
        match self.kind.as_str() {
            "Z" => NodeKind::Z,
            "X" => NodeKind::X,
            _ => NodeKind::Other,
        }
    }
}

/// A graph as delivered by the state provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub labels: HashMap<String, NodeLabel>,
}

impl GraphSnapshot {
    /// Label for a node, if any.
    pub fn label(&self, node: &NodeId) -> Option<&NodeLabel> {
        self.labels.get(&node.to_string())
    }

    /// Kind letter shown for a node. Unlabelled nodes are drawn as `Z`.
    pub fn kind_name(&self, node: &NodeId) -> &str {
        self.label(node).map_or("Z", |label| label.kind.as_str())
    }

    /// Kind of a node. Unlabelled nodes are `Z`.
    pub fn kind(&self, node: &NodeId) -> NodeKind {
        self.label(node).map_or(NodeKind::Z, NodeLabel::node_kind)
    }

    /// Positions every node evenly on a circle centred in a `width` x `height`
    /// surface, radius `0.6 * min(cx, cy)`, starting at angle zero.
    pub fn circular_layout(&self, width: f32, height: f32) -> HashMap<&NodeId, Vec2> {
        let center = Vec2::new(width / 2.0, height / 2.0);
        let radius = center.x.min(center.y) * 0.6;
        let count = self.nodes.len() as f32;
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let angle = i as f32 / count * std::f32::consts::TAU;
                (node, center + radius * Vec2::new(angle.cos(), angle.sin()))
            })
            .collect()
    }
}
