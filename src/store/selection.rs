//! Focus, hover, selection and highlight params

use aspire_types::{CollectionId, EdgeKey, NodeParams};

use super::{GraphStore, StoreChange};
use crate::events::EventKind;
use crate::styles::FOCUS_PARAM;

/// Interaction mode that turns on box selection
const BOX_SELECTION_MODE: &str = "box-selection";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionUpdate {
    /// Append one node
    Push(String),
    /// Replace the whole selection
    Update(Vec<String>),
    Clear,
}

/// Replacement params for one node; empty params clear the override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub node: String,
    pub params: NodeParams,
}

impl ParamSpec {
    pub fn new(node: impl Into<String>, params: NodeParams) -> Self {
        Self {
            node: node.into(),
            params,
        }
    }

    pub fn clear(node: impl Into<String>) -> Self {
        Self::new(node, NodeParams::new())
    }

    /// Highlight `node` with `color`
    pub fn highlight(node: impl Into<String>, color: &str) -> Self {
        let mut params = NodeParams::new();
        params.insert(FOCUS_PARAM.to_string(), color.to_string());
        Self::new(node, params)
    }
}

impl GraphStore {
    /// `node:select`. A single id becomes the focus node and is highlighted;
    /// the previous focus loses its highlight. An empty selection only drops
    /// the highlight.
    pub fn on_node_select(&mut self, _kind: EventKind, ids: Vec<String>) {
        match ids.as_slice() {
            [id] => {
                if let Some(previous) = self.focus_node.clone() {
                    self.replace_params([ParamSpec::clear(previous)]);
                }
                let color = self.styles.focus_color().to_string();
                self.replace_params([ParamSpec::highlight(id.clone(), &color)]);
                self.focus_node = Some(id.clone());
            }
            [] => {
                if let Some(previous) = self.focus_node.clone() {
                    self.replace_params([ParamSpec::clear(previous)]);
                }
            }
            _ => {}
        }

        self.selected_nodes = ids;
        self.notify(StoreChange::SelectionChanged);
    }

    /// `edge:select`
    pub fn on_edge_select(&mut self, _kind: EventKind, keys: Vec<EdgeKey>) {
        self.selected_edges = keys;
        self.notify(StoreChange::SelectionChanged);
    }

    /// `node:pointerover` / `node:pointerout`
    pub fn on_node_hover(&mut self, kind: EventKind, node: &str) {
        self.node_hovered = match kind {
            EventKind::NodePointerOut => None,
            _ => Some(node.to_string()),
        };
    }

    /// `view:mode`
    pub fn on_mode_update(&mut self, _kind: EventKind, mode: &str) {
        self.is_box_selection_mode = mode == BOX_SELECTION_MODE;
    }

    pub fn update_selected_nodes(&mut self, update: SelectionUpdate) {
        match update {
            SelectionUpdate::Push(id) => self.selected_nodes.push(id),
            SelectionUpdate::Update(ids) => self.selected_nodes = ids,
            SelectionUpdate::Clear => self.selected_nodes.clear(),
        }
        self.notify(StoreChange::SelectionChanged);
    }

    /// Target module for node creation and membership edits
    pub fn update_selected_module(&mut self, module: Option<CollectionId>) {
        self.selected_module = module;
        self.notify(StoreChange::SelectionChanged);
    }

    /// Replace `params` wholesale on each named node that exists
    pub fn replace_params(&mut self, specs: impl IntoIterator<Item = ParamSpec>) {
        for spec in specs {
            let Some(node) = self.nodes.get_mut(&spec.node) else {
                tracing::debug!(node = %spec.node, "params for unknown node ignored");
                continue;
            };

            if spec.params.is_empty() {
                self.param_nodes.remove(&spec.node);
            } else {
                self.param_nodes.insert(spec.node.clone());
            }
            node.params = spec.params;
            self.notify(StoreChange::ParamsChanged(spec.node));
        }
    }

    /// `view:click`. Drop every param override, the selection and the focus.
    pub fn clear_params(&mut self) {
        let overridden = std::mem::take(&mut self.param_nodes);
        for id in overridden {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.params.clear();
                self.notify(StoreChange::ParamsChanged(id));
            }
        }

        self.selected_edges.clear();
        self.selected_nodes.clear();
        self.focus_node = None;
        self.notify(StoreChange::SelectionChanged);
    }
}
