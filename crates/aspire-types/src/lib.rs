//! Shared Domain Graph Types for Aspire
//!
//! This crate is the SINGLE SOURCE OF TRUTH for every type that crosses the
//! backend boundary or lands in an exported domain snapshot.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐         ┌──────────────────┐
//! │  GraphStore      │  JSON   │  Domain backend  │
//! │  (aspire-domain) │ ◄─────► │  (REST)          │
//! └──────────────────┘         └──────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. Wire types live here - no inline request bodies in the client
//! 2. Edge keys serialize as `edge|<source>|<target>` so exported snapshots
//!    stay readable by the existing tooling
//! 3. Collection ids are the backend's integer primary keys

pub mod change_request;
pub mod error;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use change_request::*;
pub use error::ValidationError;

/// Backend primary key of a concept collection
pub type CollectionId = i64;

/// Visual override key → value (e.g. `focusColor` → `#f55d42`)
pub type NodeParams = BTreeMap<String, String>;

// ============================================================================
// NODES
// ============================================================================

fn default_difficulty() -> u32 {
    1
}

/// A concept in the course domain graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    /// Collections this concept belongs to (may be several)
    #[serde(default)]
    pub module: Vec<CollectionId>,
    #[serde(default)]
    pub params: NodeParams,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub is_new: bool,
    /// Local-only notice shown next to the node (never sent to the backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
}

impl Node {
    /// New concept whose id doubles as its name, as the backend keys concepts by name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            module: Vec::new(),
            params: NodeParams::new(),
            subject: String::new(),
            summary: String::new(),
            difficulty: default_difficulty(),
            is_saved: false,
            is_new: false,
            alert: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_modules(mut self, modules: impl IntoIterator<Item = CollectionId>) -> Self {
        self.module = modules.into_iter().collect();
        self
    }

    pub fn saved(mut self) -> Self {
        self.is_saved = true;
        self
    }

    pub fn in_module(&self, collection_id: CollectionId) -> bool {
        self.module.contains(&collection_id)
    }

    /// Reject payloads the backend would refuse anyway
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "id" });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "name" });
        }
        check_concept_id(&self.id)?;
        check_concept_id(&self.name)?;
        if self.difficulty < 1 {
            return Err(ValidationError::InvalidDifficulty {
                value: self.difficulty,
            });
        }
        Ok(())
    }
}

// ============================================================================
// EDGES
// ============================================================================

const EDGE_KEY_SEPARATOR: char = '|';
const EDGE_KEY_PREFIX: &str = "edge|";

/// Concept ids end up inside `edge|<source>|<target>` keys, so they may not
/// contain the separator
pub fn check_concept_id(id: &str) -> Result<(), ValidationError> {
    if id.contains(EDGE_KEY_SEPARATOR) {
        return Err(ValidationError::ReservedSeparator { id: id.to_string() });
    }
    Ok(())
}

/// Composite key of a prerequisite edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
}

impl EdgeKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// True if either endpoint is `node_id`
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}|{}", EDGE_KEY_PREFIX, self.source, self.target)
    }
}

impl FromStr for EdgeKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedEdgeKey { key: s.to_string() };
        let rest = s.strip_prefix(EDGE_KEY_PREFIX).ok_or_else(malformed)?;
        let (source, target) = rest.split_once(EDGE_KEY_SEPARATOR).ok_or_else(malformed)?;
        if source.is_empty() || target.is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(source, target))
    }
}

impl Serialize for EdgeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EdgeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Review state of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    #[default]
    None,
    Create,
    Delete,
}

/// Directed prerequisite relation: `source` must be mastered before `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub status: EdgeStatus,
}

impl Edge {
    /// Persisted edge with no pending change
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Result<Self, ValidationError> {
        let source = source.into();
        let target = target.into();
        if source == target {
            return Err(ValidationError::SelfLoop { node: source });
        }
        check_concept_id(&source)?;
        check_concept_id(&target)?;
        Ok(Self {
            source,
            target,
            is_saved: true,
            status: EdgeStatus::None,
        })
    }

    /// Locally created edge awaiting a change request
    pub fn draft(source: impl Into<String>, target: impl Into<String>) -> Result<Self, ValidationError> {
        let mut edge = Self::new(source, target)?;
        edge.is_saved = false;
        edge.status = EdgeStatus::Create;
        Ok(edge)
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source.clone(), self.target.clone())
    }

    /// Edges marked for deletion drop out of layout and reduction
    pub fn is_active(&self) -> bool {
        self.status != EdgeStatus::Delete
    }
}

// ============================================================================
// COLLECTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    #[default]
    Module,
    Container,
}

/// A named grouping of concepts (a course unit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub label: String,
    #[serde(default)]
    pub content_summary: Option<String>,
    #[serde(rename = "type", default)]
    pub collection_type: CollectionType,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub course_id: Option<i64>,
}

impl Collection {
    pub fn module(id: CollectionId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            content_summary: None,
            collection_type: CollectionType::Module,
            order: None,
            course_id: None,
        }
    }

    pub fn is_module(&self) -> bool {
        self.collection_type == CollectionType::Module
    }
}

/// Body of `POST /course/collection`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCollection {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_summary: Option<String>,
    #[serde(rename = "type", default)]
    pub collection_type: CollectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
}

impl NewCollection {
    pub fn into_collection(self, id: CollectionId) -> Collection {
        Collection {
            id,
            label: self.label,
            content_summary: self.content_summary,
            collection_type: self.collection_type,
            order: self.order,
            course_id: self.course_id,
        }
    }
}

/// Concept ↔ collection membership row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Junction {
    pub concept_name: String,
    pub collection_id: CollectionId,
}

impl Junction {
    pub fn new(concept_name: impl Into<String>, collection_id: CollectionId) -> Self {
        Self {
            concept_name: concept_name.into(),
            collection_id,
        }
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Exported domain document: `{nodes, edges, collections}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    #[serde(default)]
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub edges: BTreeMap<EdgeKey, Edge>,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

impl DomainSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// BACKEND ERRORS
// ============================================================================

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn is_session_expired(&self) -> bool {
        self.error_type == "SessionExpiredError"
    }
}
