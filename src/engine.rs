//! Sync Engine Module
//!
//! Composition root wiring the cache, offline queue, optimistic tracker, and
//! transport into one explicitly constructed instance. Hosts own its
//! lifecycle: `init` starts the background sweep, `dispose` stops it.
//!
//! Data flow: a mutation begins optimistically and dispatches immediately
//! when online, confirming (and invalidating cached reads) on success or
//! surfacing a failed operation with retry/rollback on error. Offline, the
//! mutation is queued and replayed by `flush` through the same confirm/fail
//! path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{composite_key, CacheManager, CacheQuery};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::models::{entity_payload, RemoteEvent};
use crate::optimistic::{OperationStatus, OptimisticOperation, OptimisticTracker};
use crate::policy::{CachePolicy, CachePolicyManager};
use crate::queue::{OfflineOperation, OfflineQueue, OperationKind, Priority, SyncResult};
use crate::retry::RetryPolicy;
use crate::tasks::spawn_cleanup_task;
use crate::transport::SyncTransport;

// == Mutation Draft ==
/// Host-supplied description of a mutation.
#[derive(Debug, Clone)]
pub struct MutationDraft {
    pub kind: OperationKind,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub data: Option<Value>,
    pub priority: Priority,
    /// Placeholder id the UI shows for a create until the server assigns one
    pub temp_id: Option<String>,
    /// Ids of operations that must succeed first when this one is queued
    pub dependencies: Vec<String>,
}

impl MutationDraft {
    /// Draft for creating an entity.
    pub fn create(entity_type: impl Into<String>, data: Value) -> Self {
        Self {
            kind: OperationKind::Create,
            entity_type: entity_type.into(),
            entity_id: None,
            data: Some(data),
            priority: Priority::Normal,
            temp_id: None,
            dependencies: Vec::new(),
        }
    }

    /// Draft for updating an entity.
    pub fn update(entity_type: impl Into<String>, entity_id: impl Into<String>, data: Value) -> Self {
        Self {
            kind: OperationKind::Update,
            entity_type: entity_type.into(),
            entity_id: Some(entity_id.into()),
            data: Some(data),
            priority: Priority::Normal,
            temp_id: None,
            dependencies: Vec::new(),
        }
    }

    /// Draft for deleting an entity.
    pub fn delete(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Delete,
            entity_type: entity_type.into(),
            entity_id: Some(entity_id.into()),
            data: None,
            priority: Priority::Normal,
            temp_id: None,
            dependencies: Vec::new(),
        }
    }

    /// Sets the scheduling priority used if the mutation is queued.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attaches a placeholder id for a create.
    pub fn with_temp_id(mut self, temp_id: impl Into<String>) -> Self {
        self.temp_id = Some(temp_id.into());
        self
    }

    /// Declares queue-ordering dependencies.
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

// == Mutation Outcome ==
/// What happened to a submitted mutation.
#[derive(Debug, Clone)]
pub enum MutationOutcome {
    /// Dispatched and confirmed; `data` is the backend's entity payload
    Confirmed { id: String, data: Value },
    /// Recorded for replay on the next `flush`
    Queued { id: String },
}

// == Sync Engine ==
/// One explicitly constructed synchronization stack (per tab/session).
pub struct SyncEngine {
    cache: Arc<RwLock<CacheManager<Value>>>,
    queue: Arc<RwLock<OfflineQueue>>,
    tracker: Arc<RwLock<OptimisticTracker<Value>>>,
    /// Dispatchable form of every begun mutation, kept for user retries
    drafts: Arc<RwLock<HashMap<String, OfflineOperation>>>,
    transport: Arc<dyn SyncTransport>,
    online: AtomicBool,
    config: SyncConfig,
    cleanup: Option<JoinHandle<()>>,
}

impl SyncEngine {
    // == Constructor ==
    /// Creates an engine with default policies.
    pub fn new(config: SyncConfig, transport: Arc<dyn SyncTransport>) -> Self {
        Self::with_policies(config, CachePolicyManager::default(), transport)
    }

    /// Creates an engine with a pre-seeded policy registry.
    pub fn with_policies(
        config: SyncConfig,
        policies: CachePolicyManager,
        transport: Arc<dyn SyncTransport>,
    ) -> Self {
        let cache = Arc::new(RwLock::new(CacheManager::new(
            policies,
            config.global_max_entries,
        )));
        let tracker = Arc::new(RwLock::new(OptimisticTracker::new(cache.clone())));
        Self {
            cache,
            queue: Arc::new(RwLock::new(OfflineQueue::new())),
            tracker,
            drafts: Arc::new(RwLock::new(HashMap::new())),
            transport,
            online: AtomicBool::new(true),
            config,
            cleanup: None,
        }
    }

    // == Lifecycle ==
    /// Starts the background expired-entry sweep. Idempotent.
    pub fn init(&mut self) {
        if self.cleanup.is_none() {
            self.cleanup = Some(spawn_cleanup_task(
                self.cache.clone(),
                self.config.cleanup_interval,
            ));
            info!("sync engine initialized");
        }
    }

    /// Stops the background sweep. The engine remains usable for
    /// foreground work afterwards.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
            info!("sync engine disposed");
        }
    }

    // == Connectivity ==
    /// Flips the online flag. Going online does not replay the queue by
    /// itself; call `flush` for that.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        info!(online, "connectivity changed");
    }

    /// Current connectivity flag.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    // == Mutate ==
    /// Submits a mutation.
    ///
    /// `apply` runs synchronously before any network traffic so the UI
    /// reflects the change immediately; `revert` is kept for a later
    /// rollback. Online, the mutation dispatches now and the returned
    /// outcome is `Confirmed` (with the backend payload) or the error that
    /// marked the operation failed. Offline, the mutation lands in the
    /// queue as `Queued`.
    pub async fn mutate<A, R>(
        &self,
        draft: MutationDraft,
        apply: A,
        revert: R,
    ) -> Result<MutationOutcome>
    where
        A: FnOnce(),
        R: FnOnce() + Send + 'static,
    {
        let op = OfflineOperation::new(
            draft.kind,
            draft.entity_type.clone(),
            draft.entity_id.clone(),
            draft.data.clone(),
        )
        .with_priority(draft.priority)
        .with_retry_policy(RetryPolicy::new(self.config.max_retries))
        .with_dependencies(draft.dependencies.clone());

        let mut tracked = OptimisticOperation::from_offline(&op);
        if let Some(temp_id) = &draft.temp_id {
            tracked = tracked.with_temp_id(temp_id.clone());
        }

        self.tracker.write().await.begin(tracked, apply, revert)?;
        self.drafts.write().await.insert(op.id.clone(), op.clone());

        if !self.is_online() {
            let id = op.id.clone();
            self.queue.write().await.enqueue(op);
            return Ok(MutationOutcome::Queued { id });
        }

        self.dispatch_tracked(op).await
    }

    // == Retry ==
    /// User-initiated retry of a failed operation: resets it to pending and
    /// re-issues the network call. Retry bookkeeping carries over.
    pub async fn retry(&self, id: &str) -> Result<MutationOutcome> {
        self.tracker.write().await.retry(id)?;
        let op = self
            .drafts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| crate::error::SyncError::UnknownOperation(id.to_string()))?;
        self.dispatch_tracked(op).await
    }

    // == Rollback ==
    /// User-initiated rollback: restores the pre-mutation UI state via the
    /// stored inverse change. Idempotent on terminal operations.
    pub async fn rollback(&self, id: &str) -> Result<()> {
        self.tracker.write().await.rollback(id)
    }

    // == Flush ==
    /// Drains the offline queue, then routes each replayed operation
    /// through the same confirm/fail path the online path uses.
    pub async fn flush(&self) -> SyncResult {
        let result = self.queue.write().await.sync(self.transport.as_ref()).await;

        let pending: Vec<String> = {
            let tracker = self.tracker.read().await;
            tracker
                .active_operations()
                .iter()
                .filter(|op| op.status == OperationStatus::Pending)
                .map(|op| op.id.clone())
                .collect()
        };

        let queue = self.queue.read().await;
        let mut tracker = self.tracker.write().await;
        for id in pending {
            if queue.is_completed(&id) {
                if let Err(err) = tracker.confirm(&id).await {
                    warn!(id = %id, error = %err, "confirm after flush failed");
                }
            } else if let Some(error) = queue.failure(&id) {
                let message = error.to_string();
                if let Err(err) = tracker.fail(&id, message) {
                    warn!(id = %id, error = %err, "fail after flush failed");
                }
            }
        }

        result
    }

    // == Remote Events ==
    /// Applies an `entity_update` notification: invalidates the entity's
    /// own entry and everything tagged with its type. Returns the number of
    /// entries removed.
    pub async fn handle_remote_event(&self, event: &RemoteEvent) -> usize {
        let query = CacheQuery {
            key: Some(composite_key(&event.entity_type, &event.entity_id)),
            tags: vec![event.entity_type.clone()],
            ..Default::default()
        };
        self.cache.write().await.invalidate(&query)
    }

    // == Dispatch ==
    async fn dispatch_tracked(&self, op: OfflineOperation) -> Result<MutationOutcome> {
        let id = op.id.clone();
        match self.transport.dispatch(&op).await {
            Ok(response) => {
                let data = entity_payload(response);
                let mut tracker = self.tracker.write().await;
                if op.kind == OperationKind::Create {
                    if let Some(server_id) = data.get("id") {
                        let server_id = match server_id {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        tracker.assign_server_id(&id, server_id)?;
                    }
                }
                tracker.confirm(&id).await?;
                Ok(MutationOutcome::Confirmed { id, data })
            }
            Err(err) => {
                if let Err(track_err) = self.tracker.write().await.fail(&id, err.to_string()) {
                    warn!(id = %id, error = %track_err, "failed to record failure");
                }
                Err(err)
            }
        }
    }

    // == Accessors ==
    /// Shared cache handle (also used to register policies at startup).
    pub fn cache(&self) -> Arc<RwLock<CacheManager<Value>>> {
        self.cache.clone()
    }

    /// Registers a cache policy for an entity type.
    pub async fn register_policy(&self, entity_type: &str, policy: CachePolicy) {
        self.cache
            .write()
            .await
            .policies_mut()
            .register_policy(entity_type, policy);
    }

    /// Status of one tracked operation.
    pub async fn status(&self, id: &str) -> Option<OperationStatus> {
        self.tracker.read().await.status(id)
    }

    /// Snapshot of live (pending or failed) operations for the host UI.
    pub async fn active_operations(&self) -> Vec<OptimisticOperation> {
        self.tracker
            .read()
            .await
            .active_operations()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of mutations awaiting replay.
    pub async fn queued_len(&self) -> usize {
        self.queue.read().await.len()
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
