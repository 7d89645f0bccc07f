//! Change request records
//!
//! A change request is a human-reviewable proposal to create or delete a
//! concept or a prerequisite edge. Requests start life as `draft` and are
//! promoted through `PUT /domain/changes/status`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CollectionId, EdgeKey, Node};

/// Backend primary key of a change request
pub type ChangeRequestId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Concept,
    ConceptToConcept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationType {
    Create,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl ValidationStatus {
    /// Query-string form used by the status endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Draft => "draft",
            ValidationStatus::Pending => "pending",
            ValidationStatus::Approved => "approved",
            ValidationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action the backend performs once a request is approved.
///
/// Serializes to `{}` when empty, which is what edge requests carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostApprovalProcedure {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub procedure_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<CollectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
}

impl PostApprovalProcedure {
    /// Insert the approved concept into `module_id`
    pub fn module_junction(module_id: CollectionId) -> Self {
        Self {
            procedure_type: Some("junction".to_string()),
            target_id: Some(module_id),
            target_table: Some("module".to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.procedure_type.is_none() && self.target_id.is_none() && self.target_table.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptData {
    pub name: String,
    pub subject: String,
    pub summary: String,
    pub difficulty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteData {
    /// Dependent concept (edge target)
    pub concept_name: String,
    /// Required concept (edge source)
    pub prereq_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityData {
    Concept(ConceptData),
    Prerequisite(PrerequisiteData),
}

/// Body of `POST /domain/changes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub is_from_llm: bool,
    #[serde(default)]
    pub post_approval_procedure: PostApprovalProcedure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub entity_data: EntityData,
    pub entity_type: EntityType,
    pub modification_type: ModificationType,
    #[serde(default)]
    pub validation_status: ValidationStatus,
}

impl ChangeRequest {
    /// Draft for a brand-new concept that lands in `module_id` once approved
    pub fn create_concept(node: &Node, module_id: CollectionId) -> Self {
        Self {
            is_from_llm: false,
            post_approval_procedure: PostApprovalProcedure::module_junction(module_id),
            entity_id: None,
            entity_data: EntityData::Concept(ConceptData {
                name: node.name.clone(),
                subject: node.subject.clone(),
                summary: node.summary.clone(),
                difficulty: node.difficulty.max(1),
            }),
            entity_type: EntityType::Concept,
            modification_type: ModificationType::Create,
            validation_status: ValidationStatus::Draft,
        }
    }

    pub fn create_prerequisite(key: &EdgeKey) -> Self {
        Self::prerequisite(key, ModificationType::Create, None)
    }

    /// Deletion requests reference the existing edge by its key
    pub fn delete_prerequisite(key: &EdgeKey) -> Self {
        Self::prerequisite(key, ModificationType::Delete, Some(key.to_string()))
    }

    fn prerequisite(
        key: &EdgeKey,
        modification_type: ModificationType,
        entity_id: Option<String>,
    ) -> Self {
        Self {
            is_from_llm: false,
            post_approval_procedure: PostApprovalProcedure::default(),
            entity_id,
            entity_data: EntityData::Prerequisite(PrerequisiteData {
                concept_name: key.target.clone(),
                prereq_name: key.source.clone(),
            }),
            entity_type: EntityType::ConceptToConcept,
            modification_type,
            validation_status: ValidationStatus::Draft,
        }
    }
}

/// `{id}` response of the create endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

// ============================================================================
// LOCAL DRAFT INDEX
// ============================================================================

/// Entity a draft is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Node(String),
    Edge(EdgeKey),
}

impl EntityKey {
    pub fn kind(&self) -> DraftKind {
        match self {
            EntityKey::Node(_) => DraftKind::Node,
            EntityKey::Edge(_) => DraftKind::Edge,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Node(id) => f.write_str(id),
            EntityKey::Edge(key) => write!(f, "{}", key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftKind {
    Node,
    Edge,
}

/// Local record of a change request that has not been approved or deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequestDraft {
    pub entity_key: EntityKey,
    pub request_id: ChangeRequestId,
    pub kind: DraftKind,
}
