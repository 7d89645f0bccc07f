//! Layout engine - layered (Sugiyama-style) positioning
//!
//! Two pipelines share the same layered core:
//!
//! * [`layout_flat`] lays out every concept in one layered drawing.
//! * [`layout_modules`] lays out each module on its own, then places the
//!   module drawings on a layered drawing of the module graph.
//!
//! Both are no-ops (return `None`) when there is at most one node or no
//! edge at all, so the caller keeps its previous position map.

pub mod config;
mod flat;
mod module;

use std::collections::BTreeMap;

use aspire_types::{Edge, EdgeKey, Node};
use serde::{Deserialize, Serialize};

pub use config::{Acyclicer, Alignment, LayoutConfig, LayoutMethod, RankDirection, Ranker};
pub use module::layout_modules;

pub(crate) use flat::{layered_layout, NodeBox};

/// Center of a laid-out box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift by `origin`
    pub fn translate(self, origin: Point) -> Self {
        Self::new(self.x + origin.x, self.y + origin.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Node id → position
pub type PositionMap = BTreeMap<String, Point>;

/// Result of a layout run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub positions: PositionMap,
    /// Extent of the drawing along x
    pub width: f64,
    /// Extent of the drawing along y
    pub height: f64,
}

impl Layout {
    /// Bounding extent of boxes of `node_size` centered on `positions`
    pub(crate) fn from_positions(positions: PositionMap, node_size: f64) -> Self {
        let mut min = Point::new(f64::MAX, f64::MAX);
        let mut max = Point::new(f64::MIN, f64::MIN);
        for p in positions.values() {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        if positions.is_empty() {
            return Self::default();
        }
        Self {
            width: max.x - min.x + node_size,
            height: max.y - min.y + node_size,
            positions,
        }
    }
}

/// Shared skip guard: nothing to lay out with ≤1 node or no edges
pub(crate) fn has_layout_work(node_count: usize, edge_count: usize) -> bool {
    node_count > 1 && edge_count > 0
}

/// Source/target pairs of every edge not marked for deletion
pub(crate) fn active_links<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Vec<(String, String)> {
    edges
        .into_iter()
        .filter(|edge| edge.is_active())
        .map(|edge| (edge.source.clone(), edge.target.clone()))
        .collect()
}

/// Lay out the whole graph as one layered drawing
pub fn layout_flat(
    nodes: &BTreeMap<String, Node>,
    edges: &BTreeMap<EdgeKey, Edge>,
    config: &LayoutConfig,
) -> Option<Layout> {
    if !has_layout_work(nodes.len(), edges.len()) {
        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            "flat layout skipped, keeping previous positions"
        );
        return None;
    }

    let boxes: Vec<NodeBox> = nodes
        .keys()
        .map(|id| NodeBox::square(id.clone(), config.node_size))
        .collect();
    let links = active_links(edges.values());

    Some(layered_layout(&boxes, &links, config))
}
