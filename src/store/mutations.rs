//! Graph edits and change-request synchronization
//!
//! Node and edge edits are applied locally before the backend call and
//! reverted if the call fails. Membership edits are applied only after the
//! backend confirms them.

use std::sync::Arc;

use aspire_types::{
    ChangeRequest, ChangeRequestId, CollectionId, Edge, EdgeKey, EdgeStatus, EntityKey, Junction,
    NewCollection, Node, ValidationError,
};

use super::selection::ParamSpec;
use super::{GraphStore, StoreChange, UNSAVED_NODE_ALERT};
use crate::change_requests::SaveReport;
use crate::error::{Result, StoreError};

/// Outcome of a module membership batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipReport {
    pub module: CollectionId,
    /// Nodes whose membership changed
    pub applied: Vec<String>,
    /// Unsaved nodes left out and flagged with an alert
    pub skipped_unsaved: Vec<String>,
    /// Nodes dropped locally because they no longer belong to any module
    pub removed_nodes: Vec<String>,
}

impl GraphStore {
    fn require_module(&self) -> Result<CollectionId> {
        self.selected_module
            .ok_or_else(|| ValidationError::NoModuleSelected.into())
    }

    fn require_focus(&self) -> Result<String> {
        self.focus_node
            .clone()
            .ok_or_else(|| ValidationError::NoFocusNode.into())
    }

    fn check_new_node(&self, node: &Node) -> Result<CollectionId> {
        self.ensure_initialized()?;
        node.validate()?;
        let module = self.require_module()?;
        if self.nodes.contains_key(&node.id) {
            return Err(ValidationError::DuplicateNode {
                id: node.id.clone(),
            }
            .into());
        }
        Ok(module)
    }

    // ========================================================================
    // NODES
    // ========================================================================

    /// Insert, highlight and focus `node`. Returns the previous focus for rollback.
    fn insert_focused_node(&mut self, node: Node) -> Option<String> {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        self.notify(StoreChange::NodeInserted(id.clone()));

        let color = self.styles.new_node_color().to_string();
        self.replace_params([ParamSpec::highlight(id.clone(), &color)]);
        self.focus_node.replace(id)
    }

    fn rollback_node_insert(&mut self, id: &str, previous_focus: Option<String>) -> Result<()> {
        tracing::warn!(node = %id, "backend rejected node, rolling back");
        if self.remove_node_local(id).is_none() {
            return Err(StoreError::Consistency(format!(
                "node {} vanished before rollback",
                id
            )));
        }
        self.focus_node = previous_focus;
        Ok(())
    }

    /// Drop a node from local state along with every reference to it
    fn remove_node_local(&mut self, id: &str) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        self.param_nodes.remove(id);
        self.selected_nodes.retain(|selected| selected != id);
        if self.focus_node.as_deref() == Some(id) {
            self.focus_node = None;
        }
        if self.node_hovered.as_deref() == Some(id) {
            self.node_hovered = None;
        }
        self.layouts.remove(id);
        self.notify(StoreChange::NodeRemoved(id.to_string()));
        Some(node)
    }

    /// Create a brand-new concept in the selected module through a draft
    /// change request. The node is shown immediately and removed again if
    /// the request cannot be posted.
    pub async fn add_node(&mut self, node: Node) -> Result<ChangeRequestId> {
        let module = self.check_new_node(&node)?;
        let id = node.id.clone();

        let node = Node {
            module: vec![module],
            params: Default::default(),
            is_saved: false,
            is_new: true,
            alert: None,
            ..node
        };
        let request = ChangeRequest::create_concept(&node, module);
        let previous_focus = self.insert_focused_node(node);

        let backend = Arc::clone(&self.backend);
        match self
            .changes
            .submit(backend.as_ref(), EntityKey::Node(id.clone()), &request)
            .await
        {
            Ok(request_id) => {
                self.notify(StoreChange::DraftsChanged);
                Ok(request_id)
            }
            Err(err) => {
                self.rollback_node_insert(&id, previous_focus)?;
                Err(err.into())
            }
        }
    }

    /// Attach a concept that already exists in the domain to the selected
    /// module. No change request is needed.
    pub async fn add_existing_node(&mut self, node: Node) -> Result<()> {
        let module = self.check_new_node(&node)?;
        let id = node.id.clone();
        let junction = Junction::new(node.name.clone(), module);

        let node = Node {
            module: vec![module],
            params: Default::default(),
            is_saved: true,
            alert: None,
            ..node
        };
        let previous_focus = self.insert_focused_node(node);

        let backend = Arc::clone(&self.backend);
        if let Err(err) = backend.add_junctions(&[junction]).await {
            self.rollback_node_insert(&id, previous_focus)?;
            return Err(err.into());
        }
        tracing::info!(node = %id, module, "existing concept attached");
        Ok(())
    }

    /// Remove every edge touching `node_id` from local state only.
    /// Returns the removed edges.
    pub fn delete_all_node_edges(&mut self, node_id: &str) -> Vec<Edge> {
        let keys: Vec<EdgeKey> = self
            .edges
            .keys()
            .filter(|key| key.touches(node_id))
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(edge) = self.edges.remove(&key) {
                self.selected_edges.retain(|selected| selected != &key);
                self.notify(StoreChange::EdgeRemoved(key));
                removed.push(edge);
            }
        }
        removed
    }

    fn restore_edges(&mut self, edges: Vec<Edge>) {
        for edge in edges {
            let key = edge.key();
            self.edges.insert(key.clone(), edge);
            self.notify(StoreChange::EdgeInserted(key));
        }
    }

    /// Remove every selected node from the course. Incident edges are
    /// detached first. A node with a draft has the draft retracted; any other
    /// node has its module memberships deleted. On a backend failure the
    /// detached edges are restored, the node stays, and the error is returned;
    /// nodes removed earlier in the batch stay removed.
    pub async fn delete_selected_nodes(&mut self) -> Result<Vec<String>> {
        self.ensure_initialized()?;
        let backend = Arc::clone(&self.backend);
        let mut removed = Vec::new();

        for id in self.selected_nodes.clone() {
            let Some(node) = self.nodes.get(&id).cloned() else {
                tracing::debug!(node = %id, "selected node no longer exists");
                continue;
            };

            let detached = self.delete_all_node_edges(&id);
            let entity = EntityKey::Node(id.clone());

            let outcome = if self.changes.has_draft(&entity) {
                let result = self.changes.delete_draft(backend.as_ref(), &entity).await;
                if result.is_ok() {
                    self.notify(StoreChange::DraftsChanged);
                }
                result.map(|_| ())
            } else {
                let junctions: Vec<Junction> = node
                    .module
                    .iter()
                    .map(|&module| Junction::new(node.name.clone(), module))
                    .collect();
                if junctions.is_empty() {
                    Ok(())
                } else {
                    backend.remove_junctions(&junctions).await
                }
            };

            if let Err(err) = outcome {
                tracing::warn!(node = %id, error = %err, "node removal failed, restoring edges");
                self.restore_edges(detached);
                return Err(err.into());
            }

            self.remove_node_local(&id);
            removed.push(id);
        }

        self.notify(StoreChange::SelectionChanged);
        Ok(removed)
    }

    // ========================================================================
    // EDGES
    // ========================================================================

    /// Draft a prerequisite edge from every selected node to the focus node.
    /// The focus node itself and edges that already exist are skipped.
    pub async fn add_selected_edges(&mut self) -> Result<Vec<EdgeKey>> {
        self.ensure_initialized()?;
        let target = self.require_focus()?;

        let mut pending = Vec::new();
        for source in &self.selected_nodes {
            if source == &target {
                tracing::debug!(node = %source, "focus node skipped as its own prerequisite");
                continue;
            }
            for id in [source, &target] {
                if !self.nodes.contains_key(id) {
                    return Err(ValidationError::UnknownNode { id: id.clone() }.into());
                }
            }
            let edge = Edge::draft(source.clone(), target.clone())?;
            if !self.edges.contains_key(&edge.key()) && !pending.contains(&edge) {
                pending.push(edge);
            }
        }

        let backend = Arc::clone(&self.backend);
        let mut created = Vec::with_capacity(pending.len());
        for edge in pending {
            let key = edge.key();
            self.edges.insert(key.clone(), edge);
            self.notify(StoreChange::EdgeInserted(key.clone()));

            let request = ChangeRequest::create_prerequisite(&key);
            let submitted = self
                .changes
                .submit(backend.as_ref(), EntityKey::Edge(key.clone()), &request)
                .await;

            if let Err(err) = submitted {
                tracing::warn!(edge = %key, error = %err, "edge draft rejected, rolling back");
                self.edges.remove(&key);
                self.notify(StoreChange::EdgeRemoved(key));
                return Err(err.into());
            }
            self.notify(StoreChange::DraftsChanged);
            created.push(key);
        }

        Ok(created)
    }

    /// Toggle deletion of one edge: retract its draft, or propose deleting it
    async fn toggle_edge_deletion(&mut self, key: EdgeKey) -> Result<()> {
        let Some(previous) = self.edges.get(&key).cloned() else {
            tracing::debug!(edge = %key, "selected edge no longer exists");
            return Ok(());
        };
        let backend = Arc::clone(&self.backend);
        let entity = EntityKey::Edge(key.clone());

        if self.changes.has_draft(&entity) {
            self.changes.delete_draft(backend.as_ref(), &entity).await?;
            self.edges.remove(&key);
            self.notify(StoreChange::DraftsChanged);
            self.notify(StoreChange::EdgeRemoved(key));
            return Ok(());
        }

        if let Some(edge) = self.edges.get_mut(&key) {
            edge.status = EdgeStatus::Delete;
            edge.is_saved = false;
        }
        self.notify(StoreChange::EdgeUpdated(key.clone()));

        let request = ChangeRequest::delete_prerequisite(&key);
        match self.changes.submit(backend.as_ref(), entity, &request).await {
            Ok(_) => {
                self.notify(StoreChange::DraftsChanged);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(edge = %key, error = %err, "edge deletion rejected, restoring");
                self.edges.insert(key.clone(), previous);
                self.notify(StoreChange::EdgeUpdated(key));
                Err(err.into())
            }
        }
    }

    /// Toggle deletion of every selected edge. A drafted edge is retracted
    /// and removed; any other edge is marked for deletion pending review.
    /// The edge selection is cleared whether or not every edge succeeded.
    pub async fn delete_selected_edges(&mut self) -> Result<()> {
        self.ensure_initialized()?;

        let keys = std::mem::take(&mut self.selected_edges);
        let mut failure = None;
        for key in keys {
            if let Err(err) = self.toggle_edge_deletion(key).await {
                failure = Some(err);
                break;
            }
        }

        self.notify(StoreChange::SelectionChanged);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // ========================================================================
    // MODULE MEMBERSHIP
    // ========================================================================

    /// Split the selection into saved nodes that pass `eligible` and unsaved
    /// nodes, flagging the unsaved ones with an alert
    fn partition_for_membership(
        &mut self,
        module: CollectionId,
        eligible: impl Fn(&Node) -> bool,
    ) -> MembershipReport {
        let mut report = MembershipReport {
            module,
            ..Default::default()
        };

        for id in self.selected_nodes.clone() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if !node.is_saved {
                node.alert = Some(UNSAVED_NODE_ALERT.to_string());
                tracing::warn!(node = %id, "unsaved node left out of membership change");
                self.notify(StoreChange::NodeUpdated(id.clone()));
                report.skipped_unsaved.push(id);
            } else if eligible(node) {
                report.applied.push(id);
            }
        }
        report
    }

    fn junctions_for(&self, ids: &[String], module: CollectionId) -> Vec<Junction> {
        ids.iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|node| Junction::new(node.name.clone(), module))
            .collect()
    }

    /// Add the selected saved nodes to the selected module
    pub async fn add_selected_nodes_to_module(&mut self) -> Result<MembershipReport> {
        self.ensure_initialized()?;
        let module = self.require_module()?;

        let report = self.partition_for_membership(module, |node| !node.in_module(module));
        if report.applied.is_empty() {
            return Ok(report);
        }

        let junctions = self.junctions_for(&report.applied, module);
        let backend = Arc::clone(&self.backend);
        backend.add_junctions(&junctions).await?;

        for id in &report.applied {
            if let Some(node) = self.nodes.get_mut(id) {
                node.module.push(module);
                self.notify(StoreChange::NodeUpdated(id.clone()));
            }
        }
        tracing::info!(module, added = report.applied.len(), "nodes added to module");
        Ok(report)
    }

    /// Remove the selected saved nodes from the selected module. A node left
    /// with no module is dropped locally, its edges first.
    pub async fn remove_selected_nodes_from_module(&mut self) -> Result<MembershipReport> {
        self.ensure_initialized()?;
        let module = self.require_module()?;

        let mut report = self.partition_for_membership(module, |node| node.in_module(module));
        if report.applied.is_empty() {
            return Ok(report);
        }

        let junctions = self.junctions_for(&report.applied, module);
        let backend = Arc::clone(&self.backend);
        backend.remove_junctions(&junctions).await?;

        for id in report.applied.clone() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            node.module.retain(|&m| m != module);
            if node.module.is_empty() {
                self.delete_all_node_edges(&id);
                self.remove_node_local(&id);
                report.removed_nodes.push(id);
            } else {
                self.notify(StoreChange::NodeUpdated(id));
            }
        }
        tracing::info!(
            module,
            removed = report.applied.len(),
            dropped = report.removed_nodes.len(),
            "nodes removed from module"
        );
        Ok(report)
    }

    // ========================================================================
    // COLLECTIONS AND SYNC
    // ========================================================================

    /// Create a collection on the backend and append it with its new id
    pub async fn add_new_collection(&mut self, collection: NewCollection) -> Result<CollectionId> {
        self.ensure_initialized()?;
        if collection.label.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "label" }.into());
        }

        let backend = Arc::clone(&self.backend);
        let id = backend.create_collection(&collection).await?;
        self.collections.push(collection.into_collection(id));
        self.notify(StoreChange::CollectionAdded(id));
        tracing::info!(collection = id, "collection created");
        Ok(id)
    }

    /// Promote every draft (nodes approved, edges pending). Approved nodes
    /// are marked saved; failed drafts stay and are listed in the report.
    pub async fn save_change_requests(&mut self) -> Result<SaveReport> {
        self.ensure_initialized()?;

        let backend = Arc::clone(&self.backend);
        let report = self.changes.save_all(backend.as_ref()).await;

        for entity in &report.approved {
            if let EntityKey::Node(id) = entity {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.is_saved = true;
                    node.alert = None;
                    self.notify(StoreChange::NodeUpdated(id.clone()));
                }
            }
        }
        if report.saved() > 0 {
            self.notify(StoreChange::DraftsChanged);
        }
        Ok(report)
    }

    /// Retract the draft for `entity`. `Ok(false)` when there is none.
    pub async fn delete_change_request(&mut self, entity: &EntityKey) -> Result<bool> {
        self.ensure_initialized()?;

        let backend = Arc::clone(&self.backend);
        let deleted = self.changes.delete_draft(backend.as_ref(), entity).await?;
        if deleted {
            self.notify(StoreChange::DraftsChanged);
        }
        Ok(deleted)
    }

    /// `PUT /domain` with a caller-built payload
    pub async fn save_domain(&self, payload: &serde_json::Value) -> Result<()> {
        self.ensure_initialized()?;
        self.backend.save_domain(payload).await?;
        Ok(())
    }
}
