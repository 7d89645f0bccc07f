//! Aspire domain graph core
//!
//! State manager for a course's prerequisite graph: concepts (nodes) grouped
//! into modules (collections), linked by "A is required for B" edges.
//!
//! # Architecture
//!
//! ```text
//! renderer events ──► events::GraphStore::dispatch ──► store (selection / mutations)
//!                                                          │
//!                                  change_requests ◄───────┤ optimistic edit, rollback on error
//!                                        │                 │
//!                                        ▼                 ▼
//!                              api::DomainBackend     aspire_graph (layout, reduction)
//!                               (HttpBackend + session refresh)
//! ```
//!
//! Layout and reduction are pure functions in `aspire-graph`; wire and data
//! types live in `aspire-types`.

pub mod api;
pub mod change_requests;
pub mod config;
pub mod error;
pub mod events;
pub mod store;
pub mod styles;

pub use api::{BackendError, DomainBackend, HttpBackend};
pub use change_requests::{ChangeRequestCoordinator, SaveReport};
pub use config::{ConfigError, DomainConfig, StorageTarget};
pub use error::{Result, StoreError};
pub use events::{EventKind, GraphEvent, Handler, HandlerTable};
pub use store::{
    GraphStore, MembershipReport, ParamSpec, SelectionUpdate, StoreChange, UNSAVED_NODE_ALERT,
};
pub use styles::StyleTable;

pub use aspire_graph::{LayoutConfig, LayoutMethod, PositionMap};
pub use aspire_types as types;
