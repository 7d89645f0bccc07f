use thiserror::Error;

/// Payload rejected before any backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Edge would connect '{node}' to itself")]
    SelfLoop { node: String },

    #[error("Missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("Difficulty must be at least 1, got {value}")]
    InvalidDifficulty { value: u32 },

    #[error("Concept id '{id}' contains the reserved '|' separator")]
    ReservedSeparator { id: String },

    #[error("Malformed edge key '{key}', expected 'edge|<source>|<target>'")]
    MalformedEdgeKey { key: String },

    #[error("Node '{id}' already exists")]
    DuplicateNode { id: String },

    #[error("Node '{id}' not found")]
    UnknownNode { id: String },

    #[error("No module selected")]
    NoModuleSelected,

    #[error("No focus node to connect selected nodes to")]
    NoFocusNode,
}
