//! Graph UI events and the handler table that routes them
//!
//! The renderer emits a fixed set of events. Each kind maps to a [`Handler`]:
//! the store's built-in behaviour, a caller-supplied closure, or nothing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aspire_types::EdgeKey;
use thiserror::Error;

use crate::store::GraphStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    EdgeSelect,
    NodePointerOver,
    NodePointerOut,
    NodeSelect,
    ViewMode,
    ViewClick,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::EdgeSelect,
        EventKind::NodePointerOver,
        EventKind::NodePointerOut,
        EventKind::NodeSelect,
        EventKind::ViewMode,
        EventKind::ViewClick,
    ];

    /// Renderer event name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::EdgeSelect => "edge:select",
            EventKind::NodePointerOver => "node:pointerover",
            EventKind::NodePointerOut => "node:pointerout",
            EventKind::NodeSelect => "node:select",
            EventKind::ViewMode => "view:mode",
            EventKind::ViewClick => "view:click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown graph event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Event with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    EdgeSelect { edges: Vec<EdgeKey> },
    NodePointerOver { node: String },
    NodePointerOut { node: String },
    NodeSelect { nodes: Vec<String> },
    /// Interaction mode, e.g. `box-selection` or `default`
    ViewMode { mode: String },
    ViewClick,
}

impl GraphEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GraphEvent::EdgeSelect { .. } => EventKind::EdgeSelect,
            GraphEvent::NodePointerOver { .. } => EventKind::NodePointerOver,
            GraphEvent::NodePointerOut { .. } => EventKind::NodePointerOut,
            GraphEvent::NodeSelect { .. } => EventKind::NodeSelect,
            GraphEvent::ViewMode { .. } => EventKind::ViewMode,
            GraphEvent::ViewClick => EventKind::ViewClick,
        }
    }
}

pub type EventCallback = Arc<dyn Fn(&mut GraphStore, &GraphEvent) + Send + Sync>;

#[derive(Clone)]
pub enum Handler {
    /// The store's own behaviour for this event
    Builtin,
    Custom(EventCallback),
    /// Swallow the event
    Ignore,
}

impl Handler {
    pub fn custom<F>(callback: F) -> Self
    where
        F: Fn(&mut GraphStore, &GraphEvent) + Send + Sync + 'static,
    {
        Handler::Custom(Arc::new(callback))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Builtin => f.write_str("Builtin"),
            Handler::Custom(_) => f.write_str("Custom(..)"),
            Handler::Ignore => f.write_str("Ignore"),
        }
    }
}

static BUILTIN: Handler = Handler::Builtin;

/// Event kind → handler; every kind starts as [`Handler::Builtin`]
#[derive(Debug, Clone)]
pub struct HandlerTable {
    handlers: BTreeMap<EventKind, Handler>,
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self {
            handlers: EventKind::ALL
                .into_iter()
                .map(|kind| (kind, Handler::Builtin))
                .collect(),
        }
    }
}

impl HandlerTable {
    pub fn get(&self, kind: EventKind) -> &Handler {
        self.handlers.get(&kind).unwrap_or(&BUILTIN)
    }

    pub fn set(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.insert(kind, handler);
    }

    /// Add or replace handlers
    pub fn merge(&mut self, overrides: impl IntoIterator<Item = (EventKind, Handler)>) {
        self.handlers.extend(overrides);
    }
}

impl GraphStore {
    /// Route `event` through the handler table
    pub fn dispatch(&mut self, event: &GraphEvent) {
        let kind = event.kind();
        match self.handlers().get(kind).clone() {
            Handler::Builtin => self.handle_builtin(event),
            Handler::Custom(callback) => {
                tracing::debug!(event = %kind, "custom handler");
                (*callback)(self, event);
            }
            Handler::Ignore => {}
        }
    }

    fn handle_builtin(&mut self, event: &GraphEvent) {
        let kind = event.kind();
        match event {
            GraphEvent::EdgeSelect { edges } => self.on_edge_select(kind, edges.clone()),
            GraphEvent::NodePointerOver { node } | GraphEvent::NodePointerOut { node } => {
                self.on_node_hover(kind, node)
            }
            GraphEvent::NodeSelect { nodes } => self.on_node_select(kind, nodes.clone()),
            GraphEvent::ViewMode { mode } => self.on_mode_update(kind, mode),
            GraphEvent::ViewClick => self.clear_params(),
        }
    }
}
