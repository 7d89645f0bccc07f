//! Module-aware layout
//!
//! Each module is drawn on its own, then the module drawings are placed as
//! boxes on a layered drawing of the (cycle-resolved) module graph.

use std::collections::BTreeMap;

use aspire_types::{Collection, CollectionId, Edge, EdgeKey, Node};

use super::{active_links, has_layout_work, layered_layout, Layout, LayoutConfig, NodeBox};
use crate::cycles::{resolve_module_cycles, ModuleEdgeCounts};

/// Local drawing of one module
struct ModuleDrawing {
    id: CollectionId,
    layout: Layout,
}

pub fn layout_modules(
    nodes: &BTreeMap<String, Node>,
    edges: &BTreeMap<EdgeKey, Edge>,
    collections: &[Collection],
    config: &LayoutConfig,
) -> Option<Layout> {
    if !has_layout_work(nodes.len(), edges.len()) {
        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            "module layout skipped, keeping previous positions"
        );
        return None;
    }

    let module_ids: Vec<CollectionId> = collections
        .iter()
        .filter(|c| c.is_module())
        .map(|c| c.id)
        .collect();

    let drawings: Vec<ModuleDrawing> = module_ids
        .iter()
        .map(|&id| ModuleDrawing {
            id,
            layout: layout_module(id, nodes, edges, config),
        })
        .collect();

    let counts = ModuleEdgeCounts::aggregate(nodes, edges, &module_ids);
    let module_links: Vec<(String, String)> = resolve_module_cycles(&counts)
        .into_iter()
        .map(|e| (e.source.to_string(), e.target.to_string()))
        .collect();

    let module_boxes: Vec<NodeBox> = drawings
        .iter()
        .map(|d| {
            NodeBox::new(
                d.id.to_string(),
                d.layout.width * config.group_scaling_x,
                d.layout.height * config.group_scaling_y,
            )
        })
        .collect();
    let module_layout = layered_layout(&module_boxes, &module_links, config);

    let mut positions = BTreeMap::new();
    for (drawing, module_box) in drawings.iter().zip(&module_boxes) {
        let Some(&origin) = module_layout.positions.get(&drawing.id.to_string()) else {
            continue;
        };
        tracing::trace!(module = drawing.id, w = module_box.width, h = module_box.height, "module placed");
        for (id, local) in &drawing.layout.positions {
            // later modules overwrite earlier ones for multi-module concepts
            positions.insert(id.clone(), local.translate(origin));
        }
    }

    if positions.is_empty() {
        return None;
    }
    Some(Layout::from_positions(positions, config.node_size))
}

/// Layered drawing of the concepts in `module_id` and the active edges between them
fn layout_module(
    module_id: CollectionId,
    nodes: &BTreeMap<String, Node>,
    edges: &BTreeMap<EdgeKey, Edge>,
    config: &LayoutConfig,
) -> Layout {
    let members: Vec<NodeBox> = nodes
        .values()
        .filter(|n| n.in_module(module_id))
        .map(|n| NodeBox::square(n.id.clone(), config.node_size))
        .collect();

    let internal = edges.values().filter(|e| {
        nodes.get(&e.source).is_some_and(|n| n.in_module(module_id))
            && nodes.get(&e.target).is_some_and(|n| n.in_module(module_id))
    });
    let links = active_links(internal);

    layered_layout(&members, &links, config)
}
