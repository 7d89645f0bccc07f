//! GraphStore integration tests
//!
//! Exercise the store against a recording mock backend:
//! 1. Optimistic node/edge edits and their rollback
//! 2. Module membership edits, including unsaved-node alerts
//! 3. Layout, reduction, event dispatch and export

mod helpers;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aspire_domain::styles::FOCUS_PARAM;
use aspire_domain::types::{
    CollectionType, DomainSnapshot, EdgeKey, EdgeStatus, EntityKey, Junction, NewCollection, Node,
    ValidationError,
};
use aspire_domain::{
    EventKind, GraphEvent, GraphStore, Handler, LayoutConfig, LayoutMethod, StoreChange,
    StoreError, UNSAVED_NODE_ALERT,
};
use helpers::{change_log, sample_store, Call, MockBackend, Op};
use pretty_assertions::assert_eq;

fn highlight(store: &GraphStore, id: &str) -> Option<String> {
    store.node(id)?.params.get(FOCUS_PARAM).cloned()
}

// ============================================================================
// INITIALIZATION
// ============================================================================

#[tokio::test]
async fn test_operations_require_initialize() {
    let backend = MockBackend::new();
    let mut store = GraphStore::new(backend.clone());

    let err = store.add_node(Node::new("x")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotInitialized));
    assert!(matches!(
        store.layout(&LayoutConfig::default()),
        Err(StoreError::NotInitialized)
    ));
    assert!(matches!(store.snapshot(), Err(StoreError::NotInitialized)));
    assert!(backend.calls().is_empty());
}

#[test]
fn test_initialize_rejects_self_loop() {
    let backend = MockBackend::new();
    let mut store = GraphStore::new(backend);
    let mut edges = BTreeMap::new();
    let mut edge = aspire_domain::types::Edge::new("a", "b").unwrap();
    edge.target = "a".into();
    edges.insert(EdgeKey::new("a", "a"), edge);

    let err = store
        .initialize(BTreeMap::new(), edges, Vec::new(), Vec::new(), Vec::new())
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::SelfLoop { .. })
    ));
    assert!(!store.is_initialized());
}

#[test]
fn test_initialize_rejects_separator_in_concept_ids() {
    let (mut nodes, mut edges, collections) = helpers::sample_domain();
    nodes.insert(
        "I/O | Files".into(),
        Node::new("I/O | Files").with_modules([1]).saved(),
    );
    let edge = aspire_domain::types::Edge {
        source: "I/O | Files".into(),
        target: "loops".into(),
        is_saved: true,
        status: EdgeStatus::None,
    };
    edges.insert(edge.key(), edge);

    let mut store = GraphStore::new(MockBackend::new());
    let err = store
        .initialize(nodes, edges, collections, Vec::new(), Vec::new())
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::ReservedSeparator { .. })
    ));
    assert!(!store.is_initialized());
}

#[tokio::test]
async fn test_export_round_trips_concept_ids_with_punctuation() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    store.add_node(Node::new("I/O: Files & Streams")).await.unwrap();
    store.on_node_select(EventKind::NodeSelect, vec!["I/O: Files & Streams".into()]);
    store.update_selected_nodes(aspire_domain::SelectionUpdate::Update(vec!["loops".into()]));
    store.add_selected_edges().await.unwrap();

    let snapshot = DomainSnapshot::from_json(&store.export_json().unwrap()).unwrap();
    let mut restored = GraphStore::new(MockBackend::new());
    restored.initialize_from_snapshot(snapshot).unwrap();

    assert_eq!(restored.edges(), store.edges());
    assert!(restored
        .edge(&EdgeKey::new("loops", "I/O: Files & Streams"))
        .is_some());
}

// ============================================================================
// NODES
// ============================================================================

#[tokio::test]
async fn test_add_node_inserts_drafts_and_focuses() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    let request_id = store
        .add_node(Node::new("graphs").with_subject("cs").with_summary("vertices"))
        .await
        .unwrap();

    let node = store.node("graphs").unwrap();
    assert!(!node.is_saved);
    assert!(node.is_new);
    assert_eq!(node.module, vec![1]);
    assert_eq!(store.focus_node(), Some("graphs"));
    assert_eq!(highlight(&store, "graphs").as_deref(), Some("#4cff30"));

    let draft = store
        .changes()
        .draft(&EntityKey::Node("graphs".into()))
        .unwrap();
    assert_eq!(draft.request_id, request_id);

    let Some(Call::CreateChangeRequest(request)) = backend.last(Op::CreateChangeRequest) else {
        panic!("no change request posted");
    };
    assert_eq!(request.post_approval_procedure.target_id, Some(1));
}

#[tokio::test]
async fn test_add_node_rolls_back_on_backend_error() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    store.on_node_select(EventKind::NodeSelect, vec!["loops".into()]);
    backend.fail(Op::CreateChangeRequest);

    let err = store.add_node(Node::new("graphs")).await.unwrap_err();

    assert!(matches!(err, StoreError::Backend(_)));
    assert!(store.node("graphs").is_none());
    assert_eq!(store.focus_node(), Some("loops"));
    assert!(!store.param_nodes().contains("graphs"));
    assert!(store.changes().is_empty());
}

#[tokio::test]
async fn test_add_node_validation_happens_before_backend() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    store.update_selected_module(None);
    let err = store.add_node(Node::new("graphs")).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::NoModuleSelected)
    ));

    store.update_selected_module(Some(1));
    let mut zero = Node::new("graphs");
    zero.difficulty = 0;
    assert!(matches!(
        store.add_node(zero).await,
        Err(StoreError::Validation(ValidationError::InvalidDifficulty { value: 0 }))
    ));

    assert!(matches!(
        store.add_node(Node::new("loops")).await,
        Err(StoreError::Validation(ValidationError::DuplicateNode { .. }))
    ));
    assert!(matches!(
        store.add_node(Node::new("I/O | Files")).await,
        Err(StoreError::Validation(ValidationError::ReservedSeparator { .. }))
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_add_existing_node_posts_junction() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    store.add_existing_node(Node::new("sorting")).await.unwrap();

    assert!(store.node("sorting").unwrap().is_saved);
    assert_eq!(store.changes().len(), 0);
    assert_eq!(
        backend.last(Op::AddJunctions),
        Some(Call::AddJunctions(vec![Junction::new("sorting", 1)]))
    );

    backend.fail(Op::AddJunctions);
    assert!(store.add_existing_node(Node::new("hashing")).await.is_err());
    assert!(store.node("hashing").is_none());
    assert_eq!(store.focus_node(), Some("sorting"));
}

#[tokio::test]
async fn test_delete_node_removes_edges_before_node() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    let log = change_log(&mut store);

    store.on_node_select(EventKind::NodeSelect, vec!["recursion".into()]);
    let removed = store.delete_selected_nodes().await.unwrap();

    assert_eq!(removed, vec!["recursion".to_string()]);
    assert!(store.node("recursion").is_none());
    assert!(store.edges().is_empty());
    assert_eq!(store.focus_node(), None);

    let log = log.lock().unwrap();
    let edge_at = log
        .iter()
        .position(|c| matches!(c, StoreChange::EdgeRemoved(_)))
        .unwrap();
    let node_at = log
        .iter()
        .position(|c| matches!(c, StoreChange::NodeRemoved(_)))
        .unwrap();
    assert!(edge_at < node_at);

    assert_eq!(
        backend.last(Op::RemoveJunctions),
        Some(Call::RemoveJunctions(vec![Junction::new("recursion", 1)]))
    );
}

#[tokio::test]
async fn test_delete_drafted_node_retracts_draft() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    store.add_node(Node::new("graphs")).await.unwrap();

    store.on_node_select(EventKind::NodeSelect, vec!["graphs".into()]);
    store.delete_selected_nodes().await.unwrap();

    assert!(store.node("graphs").is_none());
    assert!(store.changes().is_empty());
    assert_eq!(backend.count(Op::DeleteDraft), 1);
    assert_eq!(backend.count(Op::RemoveJunctions), 0);
}

#[tokio::test]
async fn test_delete_node_failure_restores_edges() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    backend.fail(Op::RemoveJunctions);

    store.on_node_select(EventKind::NodeSelect, vec!["loops".into()]);
    let err = store.delete_selected_nodes().await.unwrap_err();

    assert!(matches!(err, StoreError::Backend(_)));
    assert!(store.node("loops").is_some());
    assert!(store.edge(&EdgeKey::new("loops", "recursion")).is_some());
}

// ============================================================================
// EDGES
// ============================================================================

#[tokio::test]
async fn test_add_selected_edges_points_at_focus() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    store.on_node_select(EventKind::NodeSelect, vec!["recursion".into()]);
    store.update_selected_nodes(aspire_domain::SelectionUpdate::Update(vec![
        "trees".into(),
        "loops".into(),
        "recursion".into(),
    ]));

    let created = store.add_selected_edges().await.unwrap();

    // loops → recursion exists and recursion → recursion is the focus itself
    assert_eq!(created, vec![EdgeKey::new("trees", "recursion")]);
    let edge = store.edge(&EdgeKey::new("trees", "recursion")).unwrap();
    assert_eq!(edge.status, EdgeStatus::Create);
    assert!(!edge.is_saved);
    assert_eq!(backend.count(Op::CreateChangeRequest), 1);
}

#[tokio::test]
async fn test_add_selected_edges_requires_focus_and_known_nodes() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    store.update_selected_nodes(aspire_domain::SelectionUpdate::Update(vec!["trees".into()]));
    assert!(matches!(
        store.add_selected_edges().await,
        Err(StoreError::Validation(ValidationError::NoFocusNode))
    ));

    store.on_node_select(EventKind::NodeSelect, vec!["recursion".into()]);
    store.update_selected_nodes(aspire_domain::SelectionUpdate::Push("ghost".into()));
    assert!(matches!(
        store.add_selected_edges().await,
        Err(StoreError::Validation(ValidationError::UnknownNode { .. }))
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_add_edge_rolls_back_on_backend_error() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    backend.fail(Op::CreateChangeRequest);

    store.on_node_select(EventKind::NodeSelect, vec!["recursion".into()]);
    store.update_selected_nodes(aspire_domain::SelectionUpdate::Update(vec!["trees".into()]));

    assert!(store.add_selected_edges().await.is_err());
    assert!(store.edge(&EdgeKey::new("trees", "recursion")).is_none());
    assert!(store.changes().is_empty());
}

#[tokio::test]
async fn test_delete_edge_toggle() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    let key = EdgeKey::new("loops", "recursion");

    // saved edge: propose deletion
    store.on_edge_select(EventKind::EdgeSelect, vec![key.clone()]);
    store.delete_selected_edges().await.unwrap();

    let edge = store.edge(&key).unwrap();
    assert_eq!(edge.status, EdgeStatus::Delete);
    assert!(!edge.is_saved);
    assert!(store.selected_edges().is_empty());
    let Some(Call::CreateChangeRequest(request)) = backend.last(Op::CreateChangeRequest) else {
        panic!("no deletion request posted");
    };
    assert_eq!(request.entity_id.as_deref(), Some("edge|loops|recursion"));

    // drafted edge: retract and drop
    store.on_edge_select(EventKind::EdgeSelect, vec![key.clone()]);
    store.delete_selected_edges().await.unwrap();

    assert!(store.edge(&key).is_none());
    assert!(store.changes().is_empty());
    assert_eq!(backend.count(Op::DeleteDraft), 1);
}

#[tokio::test]
async fn test_delete_edge_failure_restores_edge_and_clears_selection() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    let key = EdgeKey::new("loops", "recursion");
    backend.fail(Op::CreateChangeRequest);

    store.on_edge_select(EventKind::EdgeSelect, vec![key.clone()]);
    assert!(store.delete_selected_edges().await.is_err());

    let edge = store.edge(&key).unwrap();
    assert_eq!(edge.status, EdgeStatus::None);
    assert!(edge.is_saved);
    assert!(store.selected_edges().is_empty());
}

// ============================================================================
// MODULE MEMBERSHIP
// ============================================================================

#[tokio::test]
async fn test_membership_skips_unsaved_nodes_with_alert() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    store.add_node(Node::new("graphs")).await.unwrap();

    store.update_selected_module(Some(2));
    store.update_selected_nodes(aspire_domain::SelectionUpdate::Update(vec![
        "graphs".into(),
        "loops".into(),
    ]));
    let report = store.add_selected_nodes_to_module().await.unwrap();

    assert_eq!(report.applied, vec!["loops".to_string()]);
    assert_eq!(report.skipped_unsaved, vec!["graphs".to_string()]);
    assert_eq!(
        store.node("graphs").unwrap().alert.as_deref(),
        Some(UNSAVED_NODE_ALERT)
    );
    assert_eq!(store.node("loops").unwrap().module, vec![1, 2]);
    assert_eq!(
        backend.last(Op::AddJunctions),
        Some(Call::AddJunctions(vec![Junction::new("loops", 2)]))
    );
}

#[tokio::test]
async fn test_membership_not_applied_when_backend_fails() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    backend.fail(Op::AddJunctions);

    store.update_selected_module(Some(2));
    store.update_selected_nodes(aspire_domain::SelectionUpdate::Update(vec!["loops".into()]));
    assert!(store.add_selected_nodes_to_module().await.is_err());
    assert_eq!(store.node("loops").unwrap().module, vec![1]);
}

#[tokio::test]
async fn test_removing_last_module_drops_node() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    store.update_selected_module(Some(1));
    store.update_selected_nodes(aspire_domain::SelectionUpdate::Update(vec![
        "recursion".into(),
        "trees".into(),
    ]));
    let report = store.remove_selected_nodes_from_module().await.unwrap();

    // trees is not in module 1, so only recursion is affected
    assert_eq!(report.applied, vec!["recursion".to_string()]);
    assert_eq!(report.removed_nodes, vec!["recursion".to_string()]);
    assert!(store.node("recursion").is_none());
    assert!(store.edge(&EdgeKey::new("loops", "recursion")).is_none());
    assert!(store.node("trees").is_some());
}

#[tokio::test]
async fn test_add_new_collection_takes_server_id() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    let id = store
        .add_new_collection(NewCollection {
            label: "Graphs".into(),
            content_summary: None,
            collection_type: CollectionType::Module,
            order: Some(3),
            course_id: None,
        })
        .await
        .unwrap();

    let created = store.collections().last().unwrap();
    assert_eq!(created.id, id);
    assert_eq!(created.label, "Graphs");
}

// ============================================================================
// LAYOUT AND ANALYSIS
// ============================================================================

#[tokio::test]
async fn test_layout_dispatches_on_method() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    assert!(store.layout(&LayoutConfig::default()).unwrap());
    assert_eq!(store.layouts().len(), 3);

    let module_wise = LayoutConfig::default().with_method(LayoutMethod::ModuleWise);
    assert!(store.layout(&module_wise).unwrap());
    assert_eq!(store.layouts().len(), 3);
}

#[tokio::test]
async fn test_layout_skip_keeps_previous_positions() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    store.layout(&LayoutConfig::default()).unwrap();
    let before = store.layouts().clone();

    store.on_node_select(EventKind::NodeSelect, vec!["loops".into()]);
    store.delete_selected_nodes().await.unwrap();
    // two nodes left, no edges
    assert!(!store.layout(&LayoutConfig::default()).unwrap());
    assert_eq!(store.layouts()["trees"], before["trees"]);
}

#[tokio::test]
async fn test_redundant_edges_selected() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    store.on_node_select(EventKind::NodeSelect, vec!["trees".into()]);
    store.update_selected_nodes(aspire_domain::SelectionUpdate::Update(vec![
        "loops".into(),
        "recursion".into(),
    ]));
    store.add_selected_edges().await.unwrap();

    assert_eq!(store.highlight_redundant_edges().unwrap(), 1);
    assert_eq!(store.selected_edges(), [EdgeKey::new("loops", "trees")]);
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn test_custom_handler_overrides_builtin() {
    let backend = MockBackend::new();
    let mut store = GraphStore::new(backend);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let (nodes, edges, collections) = helpers::sample_domain();
    store
        .initialize(
            nodes,
            edges,
            collections,
            vec![(
                EventKind::NodeSelect,
                Handler::custom(move |_, _| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
            )],
            vec![("focusColor".to_string(), "#123456".to_string())],
        )
        .unwrap();

    store.dispatch(&GraphEvent::NodeSelect {
        nodes: vec!["loops".into()],
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.selected_nodes().is_empty());

    // other events keep their built-in behaviour
    store.dispatch(&GraphEvent::NodePointerOver {
        node: "loops".into(),
    });
    assert_eq!(store.node_hovered(), Some("loops"));
    assert_eq!(store.styles().focus_color(), "#123456");
}

#[tokio::test]
async fn test_view_click_clears_params() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);

    store.dispatch(&GraphEvent::NodeSelect {
        nodes: vec!["loops".into()],
    });
    assert_eq!(highlight(&store, "loops").as_deref(), Some("#f55d42"));

    store.dispatch(&GraphEvent::ViewClick);
    assert_eq!(highlight(&store, "loops"), None);
    assert_eq!(store.focus_node(), None);
    assert!(store.selected_nodes().is_empty());
}

#[tokio::test]
async fn test_version_bumps_and_subscribers_see_changes() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    let log = change_log(&mut store);
    let before = store.version();

    store.add_node(Node::new("graphs")).await.unwrap();

    assert!(store.version() > before);
    let log = log.lock().unwrap();
    assert_eq!(log.first(), Some(&StoreChange::NodeInserted("graphs".into())));
    assert!(log.contains(&StoreChange::DraftsChanged));
}

// ============================================================================
// EXPORT
// ============================================================================

#[tokio::test]
async fn test_export_round_trips_through_initialize() {
    let backend = MockBackend::new();
    let mut store = sample_store(&backend);
    store.add_node(Node::new("graphs")).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = store.save_domain_to_json(dir.path()).unwrap();
    assert!(!store.is_saving());
    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("domain_model_") && file_name.ends_with(".json"));

    let snapshot = DomainSnapshot::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(snapshot, store.snapshot().unwrap());

    let mut restored = GraphStore::new(MockBackend::new());
    restored.initialize_from_snapshot(snapshot).unwrap();
    assert_eq!(restored.nodes(), store.nodes());
    assert_eq!(restored.edges(), store.edges());
    assert_eq!(restored.collections(), store.collections());
    assert!(restored.param_nodes().contains("graphs"));
}

#[tokio::test]
async fn test_save_domain_passes_payload_through() {
    let backend = MockBackend::new();
    let store = sample_store(&backend);
    let payload = serde_json::json!({"history": []});

    store.save_domain(&payload).await.unwrap();
    assert_eq!(backend.last(Op::SaveDomain), Some(Call::SaveDomain(payload)));
}
