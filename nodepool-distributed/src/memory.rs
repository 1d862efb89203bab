//! In-memory coordination backends
//!
//! These back the test suites and are usable as a single-process backend.
//! All of them are cheap to clone; clones share state.

use crate::context::CallContext;
use crate::discovery::ServerVersion;
use crate::error::StoreError;
use crate::lease::{Lease, LeaseKey};
use crate::node::{Node, NodeStore};
use crate::store::LeaseStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// How [`MemoryLeaseStore`] treats `resource_version` on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// Updates overwrite whatever is stored.
    #[default]
    LastWriteWins,
    /// Updates carrying a stale `resource_version` fail with `Conflict`.
    ResourceVersion,
}

/// Lease store operations, for fault injection and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Default)]
struct LeaseTable {
    leases: HashMap<LeaseKey, Lease>,
    version: u64,
    faults: HashMap<StoreOp, VecDeque<StoreError>>,
    log: Vec<StoreOp>,
}

impl LeaseTable {
    /// Log the call and pop an injected fault, if any.
    fn enter(&mut self, op: StoreOp) -> Result<(), StoreError> {
        self.log.push(op);
        match self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn stamp(&mut self, mut lease: Lease) -> Lease {
        self.version += 1;
        lease.resource_version = Some(self.version.to_string());
        lease
    }
}

/// Lease store held in process memory.
#[derive(Clone, Default)]
pub struct MemoryLeaseStore {
    table: Arc<Mutex<LeaseTable>>,
    mode: ConcurrencyMode,
    latency: Option<Duration>,
    get_barrier: Option<Arc<Barrier>>,
}

impl MemoryLeaseStore {
    /// Create an empty store with last-write-wins updates.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ConcurrencyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Delay every call by `latency` before it takes effect.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every `get` wait on `barrier` after reading.
    ///
    /// With a barrier sized to the number of racing callers, every caller
    /// reads before any of them writes. Every `get` waits, including the
    /// read inside `release_lease` and a lone `acquire_lease`: with fewer
    /// concurrent readers than the barrier size the call never returns.
    pub fn with_get_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.get_barrier = Some(barrier);
        self
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Seed a record, stamping a fresh resource version.
    pub fn insert(&self, lease: Lease) -> Lease {
        let mut table = self.table.lock();
        let lease = table.stamp(lease);
        table.leases.insert(lease.key(), lease.clone());
        lease
    }

    /// Read a record without going through the store interface.
    pub fn snapshot(&self, key: &LeaseKey) -> Option<Lease> {
        self.table.lock().leases.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.lock().leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail the next call of `op` with `err`. Faults queue up per operation.
    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.table.lock().faults.entry(op).or_default().push_back(err);
    }

    /// Every call made so far, in order.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.table.lock().log.clone()
    }

    /// Number of create, update and delete calls.
    pub fn write_count(&self) -> usize {
        self.table
            .lock()
            .log
            .iter()
            .filter(|op| !matches!(op, StoreOp::Get))
            .count()
    }

    async fn pause(&self, ctx: &CallContext) -> Result<(), StoreError> {
        ctx.check()?;
        if let Some(latency) = self.latency {
            ctx.run(async {
                tokio::time::sleep(latency).await;
                Ok(())
            })
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn get(&self, ctx: &CallContext, key: &LeaseKey) -> Result<Lease, StoreError> {
        self.pause(ctx).await?;

        let result = {
            let mut table = self.table.lock();
            table.enter(StoreOp::Get).and_then(|()| {
                table
                    .leases
                    .get(key)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(format!("lease {}", key)))
            })
        };

        if let Some(barrier) = &self.get_barrier {
            barrier.wait().await;
        }
        result
    }

    async fn create(&self, ctx: &CallContext, lease: Lease) -> Result<Lease, StoreError> {
        self.pause(ctx).await?;

        let mut table = self.table.lock();
        table.enter(StoreOp::Create)?;

        let key = lease.key();
        if table.leases.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!("lease {}", key)));
        }
        let lease = table.stamp(lease);
        table.leases.insert(key, lease.clone());
        Ok(lease)
    }

    async fn update(&self, ctx: &CallContext, lease: Lease) -> Result<Lease, StoreError> {
        self.pause(ctx).await?;

        let mut table = self.table.lock();
        table.enter(StoreOp::Update)?;

        let key = lease.key();
        let stored = table
            .leases
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("lease {}", key)))?;

        if self.mode == ConcurrencyMode::ResourceVersion
            && lease.resource_version.is_some()
            && lease.resource_version != stored.resource_version
        {
            return Err(StoreError::Conflict(format!(
                "lease {} was modified (stored version {}, given {})",
                key,
                stored.resource_version.as_deref().unwrap_or(""),
                lease.resource_version.as_deref().unwrap_or("")
            )));
        }

        let lease = table.stamp(lease);
        table.leases.insert(key, lease.clone());
        Ok(lease)
    }

    async fn delete(&self, ctx: &CallContext, key: &LeaseKey) -> Result<(), StoreError> {
        self.pause(ctx).await?;

        let mut table = self.table.lock();
        table.enter(StoreOp::Delete)?;

        table
            .leases
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("lease {}", key)))
    }
}

#[derive(Default)]
struct NodeTable {
    nodes: HashMap<String, Node>,
    faults: VecDeque<StoreError>,
    patches: usize,
}

/// Node store held in process memory, applying JSON merge patches.
#[derive(Clone, Default)]
pub struct MemoryNodeStore {
    table: Arc<Mutex<NodeTable>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, node: Node) {
        self.table.lock().nodes.insert(node.name().to_string(), node);
    }

    pub fn snapshot(&self, name: &str) -> Option<Node> {
        self.table.lock().nodes.get(name).cloned()
    }

    /// Fail the next call, whichever operation it is.
    pub fn fail_next(&self, err: StoreError) {
        self.table.lock().faults.push_back(err);
    }

    /// Number of patches applied.
    pub fn patch_count(&self) -> usize {
        self.table.lock().patches
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn get(&self, ctx: &CallContext, name: &str) -> Result<Node, StoreError> {
        ctx.check()?;
        let mut table = self.table.lock();
        if let Some(err) = table.faults.pop_front() {
            return Err(err);
        }
        table
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("node {}", name)))
    }

    async fn merge_patch(&self, ctx: &CallContext, name: &str, patch: &Value) -> Result<Node, StoreError> {
        ctx.check()?;
        let mut table = self.table.lock();
        if let Some(err) = table.faults.pop_front() {
            return Err(err);
        }

        let node = table
            .nodes
            .get(name)
            .ok_or_else(|| StoreError::NotFound(format!("node {}", name)))?;

        let mut document =
            serde_json::to_value(node).map_err(|e| StoreError::Rejected(e.to_string()))?;
        merge_json(&mut document, patch);
        let mut patched: Node =
            serde_json::from_value(document).map_err(|e| StoreError::Rejected(e.to_string()))?;

        // The patch cannot rename the record.
        patched.metadata.name = name.to_string();
        table.nodes.insert(name.to_string(), patched.clone());
        table.patches += 1;
        Ok(patched)
    }
}

#[derive(Default)]
struct VersionState {
    faults: VecDeque<StoreError>,
    calls: usize,
}

/// Server version source with a fixed answer.
#[derive(Clone, Default)]
pub struct StaticServerVersion {
    version: Option<String>,
    latency: Option<Duration>,
    state: Arc<Mutex<VersionState>>,
}

impl StaticServerVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Default::default()
        }
    }

    /// A source whose discovery always fails with `Transient`.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail_next(&self, err: StoreError) {
        self.state.lock().faults.push_back(err);
    }

    /// Number of discovery calls seen.
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }
}

#[async_trait]
impl ServerVersion for StaticServerVersion {
    async fn server_version(&self, ctx: &CallContext) -> Result<String, StoreError> {
        ctx.check()?;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        state.calls += 1;
        if let Some(err) = state.faults.pop_front() {
            return Err(err);
        }
        self.version
            .clone()
            .ok_or_else(|| StoreError::Transient("server version unavailable".to_string()))
    }
}

/// Apply an RFC 7386 JSON merge patch to `target`.
///
/// Objects merge recursively, `null` removes a key, anything else replaces.
pub fn merge_json(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_json(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
