//! Change request coordination
//!
//! Tracks the local draft index (entity → backend change request id) and
//! drives the draft → approved/pending promotion.

use std::collections::BTreeMap;

use aspire_types::{
    ChangeRequest, ChangeRequestDraft, ChangeRequestId, DraftKind, EntityKey, ValidationStatus,
};

use crate::api::{BackendError, DomainBackend};

/// Outcome of [`ChangeRequestCoordinator::save_all`]
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Node drafts promoted to `approved`
    pub approved: Vec<EntityKey>,
    /// Edge drafts promoted to `pending`
    pub pending: Vec<EntityKey>,
    /// Drafts kept because the status update failed
    pub failed: Vec<(EntityKey, BackendError)>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn saved(&self) -> usize {
        self.approved.len() + self.pending.len()
    }
}

#[derive(Debug, Default)]
pub struct ChangeRequestCoordinator {
    drafts: BTreeMap<EntityKey, ChangeRequestDraft>,
}

impl ChangeRequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status a draft of `kind` is promoted to on save
    pub fn status_for(kind: DraftKind) -> ValidationStatus {
        match kind {
            DraftKind::Node => ValidationStatus::Approved,
            DraftKind::Edge => ValidationStatus::Pending,
        }
    }

    /// Post `request` and record it as the draft for `entity`
    pub async fn submit(
        &mut self,
        backend: &dyn DomainBackend,
        entity: EntityKey,
        request: &ChangeRequest,
    ) -> Result<ChangeRequestId, BackendError> {
        let request_id = backend.create_change_request(request).await?;
        tracing::info!(entity = %entity, request_id, "change request drafted");

        let kind = entity.kind();
        self.drafts.insert(
            entity.clone(),
            ChangeRequestDraft {
                entity_key: entity,
                request_id,
                kind,
            },
        );
        Ok(request_id)
    }

    /// Retract the backend draft for `entity`. `Ok(false)` when there is none.
    pub async fn delete_draft(
        &mut self,
        backend: &dyn DomainBackend,
        entity: &EntityKey,
    ) -> Result<bool, BackendError> {
        let Some(draft) = self.drafts.get(entity) else {
            tracing::debug!(entity = %entity, "no draft to delete");
            return Ok(false);
        };

        backend.delete_change_request_draft(draft.request_id).await?;
        self.drafts.remove(entity);
        tracing::info!(entity = %entity, "change request draft deleted");
        Ok(true)
    }

    /// Promote every draft: nodes to `approved`, edges to `pending`.
    /// Successful drafts are dropped; failed ones stay for a later retry.
    pub async fn save_all(&mut self, backend: &dyn DomainBackend) -> SaveReport {
        let mut report = SaveReport::default();
        let drafts: Vec<ChangeRequestDraft> = self.drafts.values().cloned().collect();

        for draft in drafts {
            let status = Self::status_for(draft.kind);
            match backend
                .update_change_request_status(draft.request_id, status)
                .await
            {
                Ok(()) => {
                    self.drafts.remove(&draft.entity_key);
                    match draft.kind {
                        DraftKind::Node => report.approved.push(draft.entity_key),
                        DraftKind::Edge => report.pending.push(draft.entity_key),
                    }
                }
                Err(err) => {
                    tracing::warn!(entity = %draft.entity_key, error = %err, "change request not saved");
                    report.failed.push((draft.entity_key, err));
                }
            }
        }

        tracing::info!(
            saved = report.saved(),
            failed = report.failed.len(),
            "change requests saved"
        );
        report
    }

    pub fn has_draft(&self, entity: &EntityKey) -> bool {
        self.drafts.contains_key(entity)
    }

    pub fn draft(&self, entity: &EntityKey) -> Option<&ChangeRequestDraft> {
        self.drafts.get(entity)
    }

    pub fn drafts(&self) -> impl Iterator<Item = &ChangeRequestDraft> {
        self.drafts.values()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Forget every local draft without touching the backend
    pub(crate) fn clear(&mut self) {
        self.drafts.clear();
    }
}
