//! GraphStore - canonical in-memory state of the domain graph
//!
//! Holds nodes, edges, collections, selection, highlight params and the last
//! computed layout. Mutations that touch the backend are applied locally
//! first and rolled back if the backend call fails.
//!
//! Every state change bumps [`GraphStore::version`] and is reported to
//! subscribers as a [`StoreChange`], in mutation order.
//!
//! Operations live in submodules:
//!
//! * `selection` - focus, hover, selection and param overrides
//! * `mutations` - node/edge/membership edits and change-request sync
//! * `export` - snapshot and JSON export

mod export;
mod mutations;
mod selection;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use aspire_graph::{layout_flat, layout_modules, redundant_edges, LayoutConfig, LayoutMethod, PositionMap};
use aspire_types::{
    check_concept_id, Collection, CollectionId, DomainSnapshot, Edge, EdgeKey, Node, ValidationError,
};

use crate::api::DomainBackend;
use crate::change_requests::ChangeRequestCoordinator;
use crate::error::{Result, StoreError};
use crate::events::{EventKind, Handler, HandlerTable};
use crate::styles::StyleTable;

pub use export::snapshot_file_name;
pub use mutations::MembershipReport;
pub use selection::{ParamSpec, SelectionUpdate};

/// Alert set on unsaved nodes excluded from a batch operation
pub const UNSAVED_NODE_ALERT: &str = "Node must be saved prior to additional changes";

/// Notification sent to subscribers after each state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Initialized,
    NodeInserted(String),
    NodeUpdated(String),
    NodeRemoved(String),
    EdgeInserted(EdgeKey),
    EdgeUpdated(EdgeKey),
    EdgeRemoved(EdgeKey),
    CollectionAdded(CollectionId),
    SelectionChanged,
    ParamsChanged(String),
    DraftsChanged,
    LayoutUpdated,
    SavingChanged(bool),
}

pub type Subscriber = Box<dyn Fn(&StoreChange) + Send + Sync>;

pub struct GraphStore {
    backend: Arc<dyn DomainBackend>,

    // Canonical graph state
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
    collections: Vec<Collection>,
    changes: ChangeRequestCoordinator,

    // Interaction state
    focus_node: Option<String>,
    node_hovered: Option<String>,
    selected_nodes: Vec<String>,
    selected_edges: Vec<EdgeKey>,
    selected_module: Option<CollectionId>,
    param_nodes: BTreeSet<String>,
    is_box_selection_mode: bool,

    layouts: PositionMap,
    handlers: HandlerTable,
    styles: StyleTable,

    is_initialized: bool,
    saving: bool,
    version: u64,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("collections", &self.collections.len())
            .field("drafts", &self.changes.len())
            .field("is_initialized", &self.is_initialized)
            .field("version", &self.version)
            .finish()
    }
}

impl GraphStore {
    pub fn new(backend: Arc<dyn DomainBackend>) -> Self {
        Self {
            backend,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            collections: Vec::new(),
            changes: ChangeRequestCoordinator::new(),
            focus_node: None,
            node_hovered: None,
            selected_nodes: Vec::new(),
            selected_edges: Vec::new(),
            selected_module: None,
            param_nodes: BTreeSet::new(),
            is_box_selection_mode: false,
            layouts: PositionMap::new(),
            handlers: HandlerTable::default(),
            styles: StyleTable::default(),
            is_initialized: false,
            saving: false,
            version: 0,
            subscribers: Vec::new(),
        }
    }

    // ========================================================================
    // INITIALIZATION
    // ========================================================================

    /// Replace all canonical state and merge handler/style overrides over
    /// the defaults. Drafts and transient selection state are reset.
    pub fn initialize(
        &mut self,
        nodes: BTreeMap<String, Node>,
        edges: BTreeMap<EdgeKey, Edge>,
        collections: Vec<Collection>,
        handler_overrides: impl IntoIterator<Item = (EventKind, Handler)>,
        style_overrides: impl IntoIterator<Item = (String, String)>,
    ) -> Result<()> {
        for id in nodes.keys() {
            check_concept_id(id)?;
        }
        for (key, edge) in &edges {
            check_concept_id(&edge.source)?;
            check_concept_id(&edge.target)?;
            if edge.source == edge.target {
                return Err(ValidationError::SelfLoop {
                    node: edge.source.clone(),
                }
                .into());
            }
            if key.source != edge.source || key.target != edge.target {
                return Err(ValidationError::MalformedEdgeKey {
                    key: key.to_string(),
                }
                .into());
            }
            if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
                tracing::warn!(edge = %key, "edge references a node that is not loaded");
            }
        }

        self.param_nodes = nodes
            .values()
            .filter(|n| !n.params.is_empty())
            .map(|n| n.id.clone())
            .collect();
        self.nodes = nodes;
        self.edges = edges;
        self.collections = collections;
        self.handlers.merge(handler_overrides);
        self.styles.merge(style_overrides);

        self.changes.clear();
        self.focus_node = None;
        self.node_hovered = None;
        self.selected_nodes.clear();
        self.selected_edges.clear();
        self.layouts.clear();
        self.is_initialized = true;

        tracing::info!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            collections = self.collections.len(),
            "graph store initialized"
        );
        self.notify(StoreChange::Initialized);
        Ok(())
    }

    /// Initialize from an exported snapshot, keeping current handlers and styles
    pub fn initialize_from_snapshot(&mut self, snapshot: DomainSnapshot) -> Result<()> {
        self.initialize(
            snapshot.nodes,
            snapshot.edges,
            snapshot.collections,
            Vec::new(),
            Vec::new(),
        )
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    pub(crate) fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized {
            Ok(())
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    // ========================================================================
    // CHANGE NOTIFICATION
    // ========================================================================

    /// Monotonic counter bumped on every state change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub(crate) fn notify(&mut self, change: StoreChange) {
        self.version += 1;
        for subscriber in &self.subscribers {
            subscriber(&change);
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn nodes(&self) -> &BTreeMap<String, Node> {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edges(&self) -> &BTreeMap<EdgeKey, Edge> {
        &self.edges
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn changes(&self) -> &ChangeRequestCoordinator {
        &self.changes
    }

    pub fn focus_node(&self) -> Option<&str> {
        self.focus_node.as_deref()
    }

    pub fn node_hovered(&self) -> Option<&str> {
        self.node_hovered.as_deref()
    }

    pub fn selected_nodes(&self) -> &[String] {
        &self.selected_nodes
    }

    pub fn selected_edges(&self) -> &[EdgeKey] {
        &self.selected_edges
    }

    pub fn selected_module(&self) -> Option<CollectionId> {
        self.selected_module
    }

    /// Nodes currently carrying a param override
    pub fn param_nodes(&self) -> &BTreeSet<String> {
        &self.param_nodes
    }

    pub fn is_box_selection_mode(&self) -> bool {
        self.is_box_selection_mode
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Positions from the last successful layout run
    pub fn layouts(&self) -> &PositionMap {
        &self.layouts
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    // ========================================================================
    // ANALYSIS
    // ========================================================================

    /// Run the layout selected by `config.method`. Returns `false` (and keeps
    /// the previous positions) when there is nothing to lay out.
    pub fn layout(&mut self, config: &LayoutConfig) -> Result<bool> {
        self.ensure_initialized()?;

        let computed = match config.method {
            LayoutMethod::Flat => layout_flat(&self.nodes, &self.edges, config),
            LayoutMethod::ModuleWise => {
                layout_modules(&self.nodes, &self.edges, &self.collections, config)
            }
        };

        let Some(layout) = computed else {
            return Ok(false);
        };
        tracing::debug!(
            method = ?config.method,
            positioned = layout.positions.len(),
            width = layout.width,
            height = layout.height,
            "layout updated"
        );
        self.layouts = layout.positions;
        self.notify(StoreChange::LayoutUpdated);
        Ok(true)
    }

    /// Select every edge implied by a longer path. Returns how many were found.
    pub fn highlight_redundant_edges(&mut self) -> Result<usize> {
        self.ensure_initialized()?;

        self.selected_edges = redundant_edges(&self.edges).into_iter().collect();
        let found = self.selected_edges.len();
        self.notify(StoreChange::SelectionChanged);
        Ok(found)
    }
}
