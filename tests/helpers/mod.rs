//! Shared fixtures for integration tests
//!
//! `MockBackend` records every call and can be told to fail specific
//! operations, so tests can check both the optimistic path and rollback.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aspire_domain::api::{BackendError, DomainBackend, Result};
use aspire_domain::types::{
    ChangeRequest, ChangeRequestId, Collection, CollectionId, Edge, EdgeKey, Junction,
    NewCollection, Node, ValidationStatus,
};
use aspire_domain::{GraphStore, StoreChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateChangeRequest,
    UpdateStatus,
    DeleteDraft,
    CreateCollection,
    AddJunctions,
    RemoveJunctions,
    SaveDomain,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateChangeRequest(ChangeRequest),
    UpdateStatus(ChangeRequestId, ValidationStatus),
    DeleteDraft(ChangeRequestId),
    CreateCollection(NewCollection),
    AddJunctions(Vec<Junction>),
    RemoveJunctions(Vec<Junction>),
    SaveDomain(serde_json::Value),
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::CreateChangeRequest(_) => Op::CreateChangeRequest,
            Call::UpdateStatus(..) => Op::UpdateStatus,
            Call::DeleteDraft(_) => Op::DeleteDraft,
            Call::CreateCollection(_) => Op::CreateCollection,
            Call::AddJunctions(_) => Op::AddJunctions,
            Call::RemoveJunctions(_) => Op::RemoveJunctions,
            Call::SaveDomain(_) => Op::SaveDomain,
        }
    }
}

pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<Op>>,
    failing_status_ids: Mutex<HashSet<ChangeRequestId>>,
    next_id: AtomicI64,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            failing_status_ids: Mutex::new(HashSet::new()),
            next_id: AtomicI64::new(100),
        })
    }

    /// Make every subsequent `op` fail with a 503
    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    /// Fail status updates for one change request only
    pub fn fail_status_for(&self, id: ChangeRequestId) {
        self.failing_status_ids.lock().unwrap().insert(id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    pub fn last(&self, op: Op) -> Option<Call> {
        self.calls().into_iter().rev().find(|c| c.op() == op)
    }

    fn record(&self, call: Call) -> Result<()> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(BackendError::Status {
                status: 503,
                body: format!("{:?} unavailable", op),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl DomainBackend for MockBackend {
    async fn create_change_request(&self, request: &ChangeRequest) -> Result<ChangeRequestId> {
        self.record(Call::CreateChangeRequest(request.clone()))?;
        Ok(self.next_id())
    }

    async fn update_change_request_status(
        &self,
        id: ChangeRequestId,
        status: ValidationStatus,
    ) -> Result<()> {
        self.record(Call::UpdateStatus(id, status))?;
        if self.failing_status_ids.lock().unwrap().contains(&id) {
            return Err(BackendError::Status {
                status: 409,
                body: format!("change request {} locked", id),
            });
        }
        Ok(())
    }

    async fn delete_change_request_draft(&self, id: ChangeRequestId) -> Result<()> {
        self.record(Call::DeleteDraft(id))
    }

    async fn create_collection(&self, collection: &NewCollection) -> Result<CollectionId> {
        self.record(Call::CreateCollection(collection.clone()))?;
        Ok(self.next_id())
    }

    async fn add_junctions(&self, junctions: &[Junction]) -> Result<()> {
        self.record(Call::AddJunctions(junctions.to_vec()))
    }

    async fn remove_junctions(&self, junctions: &[Junction]) -> Result<()> {
        self.record(Call::RemoveJunctions(junctions.to_vec()))
    }

    async fn save_domain(&self, payload: &serde_json::Value) -> Result<()> {
        self.record(Call::SaveDomain(payload.clone()))
    }
}

/// Install a test-writer subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Saved concepts: loops, recursion (module 1), trees (module 2);
/// one saved edge loops → recursion
pub fn sample_domain() -> (BTreeMap<String, Node>, BTreeMap<EdgeKey, Edge>, Vec<Collection>) {
    let nodes = [("loops", 1), ("recursion", 1), ("trees", 2)]
        .into_iter()
        .map(|(id, module)| {
            (
                id.to_string(),
                Node::new(id).with_subject("cs").with_modules([module]).saved(),
            )
        })
        .collect();

    let edge = Edge::new("loops", "recursion").unwrap();
    let edges = [(edge.key(), edge)].into_iter().collect();

    let collections = vec![
        Collection::module(1, "Basics"),
        Collection::module(2, "Structures"),
    ];
    (nodes, edges, collections)
}

/// Initialized store over [`sample_domain`], module 1 selected
pub fn sample_store(backend: &Arc<MockBackend>) -> GraphStore {
    init_tracing();
    let mut store = GraphStore::new(backend.clone());
    let (nodes, edges, collections) = sample_domain();
    store
        .initialize(nodes, edges, collections, Vec::new(), Vec::new())
        .unwrap();
    store.update_selected_module(Some(1));
    store
}

/// Record every store change into a shared log
pub fn change_log(store: &mut GraphStore) -> Arc<Mutex<Vec<StoreChange>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    store.subscribe(move |change| sink.lock().unwrap().push(change.clone()));
    log
}
