//! Optimistic Tracker Module
//!
//! Bridges immediate UI feedback and eventual network confirmation. The
//! tracker applies the caller's optimistic mutation the moment an operation
//! begins, holds the inverse mutation for rollback, and invalidates the
//! cache when the backend confirms.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheManager, CacheQuery};
use crate::error::{Result, SyncError};
use crate::optimistic::{OperationStatus, OptimisticOperation};

/// Inverse mutation restoring the UI state from before an operation.
type RevertFn = Box<dyn FnOnce() + Send>;

// == Optimistic Tracker ==
/// In-memory map of in-flight mutations with user-facing retry/rollback.
pub struct OptimisticTracker<T: Clone> {
    /// Tracked operations by id
    operations: HashMap<String, OptimisticOperation>,
    /// Stored inverse mutations; consumed on rollback
    reverts: HashMap<String, RevertFn>,
    /// Cache invalidated on confirmation
    cache: Arc<RwLock<CacheManager<T>>>,
}

impl<T: Clone> OptimisticTracker<T> {
    // == Constructor ==
    /// Creates a tracker invalidating into the given cache.
    pub fn new(cache: Arc<RwLock<CacheManager<T>>>) -> Self {
        Self {
            operations: HashMap::new(),
            reverts: HashMap::new(),
            cache,
        }
    }

    // == Begin ==
    /// Starts tracking a mutation: inserts it as pending, applies the
    /// caller's optimistic UI change synchronously, and stores the inverse
    /// change for a later rollback.
    pub fn begin<A, R>(&mut self, op: OptimisticOperation, apply: A, revert: R) -> Result<()>
    where
        A: FnOnce(),
        R: FnOnce() + Send + 'static,
    {
        if self.operations.contains_key(&op.id) {
            return Err(SyncError::InvalidRequest(format!(
                "Operation {} is already tracked",
                op.id
            )));
        }

        let mut op = op;
        op.status = OperationStatus::Pending;
        debug!(id = %op.id, entity_type = %op.entity_type, "optimistic operation begun");
        self.reverts.insert(op.id.clone(), Box::new(revert));
        self.operations.insert(op.id.clone(), op);
        apply();
        Ok(())
    }

    // == Confirm ==
    /// Marks a pending operation confirmed and invalidates every cache entry
    /// tagged with its entity type, so subsequent reads are fresh.
    ///
    /// Idempotent: confirming an already-terminal operation is a no-op.
    pub async fn confirm(&mut self, id: &str) -> Result<()> {
        let op = self
            .operations
            .get_mut(id)
            .ok_or_else(|| SyncError::UnknownOperation(id.to_string()))?;

        if op.status.is_terminal() {
            return Ok(());
        }
        if op.status != OperationStatus::Pending {
            return Err(SyncError::InvalidTransition {
                id: id.to_string(),
                from: op.status.to_string(),
                action: "confirm",
            });
        }

        op.status = OperationStatus::Confirmed;
        op.error = None;
        let entity_type = op.entity_type.clone();
        self.reverts.remove(id);

        debug!(id, entity_type = %entity_type, "operation confirmed");
        self.cache
            .write()
            .await
            .invalidate(&CacheQuery::by_tags(vec![entity_type]));
        Ok(())
    }

    // == Fail ==
    /// Marks a pending operation failed. The optimistic UI change stays in
    /// place; the user decides between retry and rollback.
    pub fn fail(&mut self, id: &str, error: impl Into<String>) -> Result<()> {
        let op = self
            .operations
            .get_mut(id)
            .ok_or_else(|| SyncError::UnknownOperation(id.to_string()))?;

        if op.status != OperationStatus::Pending {
            return Err(SyncError::InvalidTransition {
                id: id.to_string(),
                from: op.status.to_string(),
                action: "fail",
            });
        }

        op.status = OperationStatus::Failed;
        op.retry_count += 1;
        op.error = Some(error.into());
        warn!(id, error = op.error.as_deref().unwrap_or(""), "operation failed");
        Ok(())
    }

    // == Retry ==
    /// User-initiated retry: resets a failed operation to pending and hands
    /// back a snapshot for re-dispatch. Retry bookkeeping is preserved, not
    /// reset; when the operation originated in the offline queue the counter
    /// is the same one the queue maintains.
    pub fn retry(&mut self, id: &str) -> Result<OptimisticOperation> {
        let op = self
            .operations
            .get_mut(id)
            .ok_or_else(|| SyncError::UnknownOperation(id.to_string()))?;

        if op.status != OperationStatus::Failed {
            return Err(SyncError::InvalidTransition {
                id: id.to_string(),
                from: op.status.to_string(),
                action: "retry",
            });
        }

        op.status = OperationStatus::Pending;
        op.error = None;
        debug!(id, retry_count = op.retry_count, "operation retried");
        Ok(op.clone())
    }

    // == Rollback ==
    /// User-initiated rollback from pending or failed: runs the stored
    /// inverse mutation exactly once and marks the operation rolled_back.
    ///
    /// Idempotent: rolling back an already-terminal operation is a no-op.
    pub fn rollback(&mut self, id: &str) -> Result<()> {
        let op = self
            .operations
            .get_mut(id)
            .ok_or_else(|| SyncError::UnknownOperation(id.to_string()))?;

        if op.status.is_terminal() {
            return Ok(());
        }

        op.status = OperationStatus::RolledBack;
        op.error = None;
        debug!(id, "operation rolled back");
        if let Some(revert) = self.reverts.remove(id) {
            revert();
        }
        Ok(())
    }

    // == Assign Server Id ==
    /// Substitutes the server-assigned id for a create's placeholder.
    pub fn assign_server_id(&mut self, id: &str, server_id: impl Into<String>) -> Result<()> {
        let op = self
            .operations
            .get_mut(id)
            .ok_or_else(|| SyncError::UnknownOperation(id.to_string()))?;
        op.entity_id = Some(server_id.into());
        op.temp_id = None;
        Ok(())
    }

    // == Accessors ==
    /// Snapshot of one operation.
    pub fn get(&self, id: &str) -> Option<&OptimisticOperation> {
        self.operations.get(id)
    }

    /// Current status of one operation.
    pub fn status(&self, id: &str) -> Option<OperationStatus> {
        self.operations.get(id).map(|op| op.status)
    }

    /// Operations still live (pending or failed), for status rendering.
    pub fn active_operations(&self) -> Vec<&OptimisticOperation> {
        self.operations
            .values()
            .filter(|op| !op.status.is_terminal())
            .collect()
    }

    /// Number of tracked operations, terminal ones included.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
