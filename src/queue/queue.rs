//! Offline Queue Module
//!
//! Ordered replay of mutations recorded while offline. The queue dispatches
//! operations in priority order, respects dependency constraints, retries
//! transport failures up to each operation's budget, and reports every drain
//! as a fresh `SyncResult`.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::queue::OfflineOperation;
use crate::transport::SyncTransport;

// == Sync Failure ==
/// One failed operation inside a drain pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    /// Id of the failed operation
    pub operation_id: String,
    /// Last error message observed for it
    pub error: String,
}

// == Sync Result ==
/// Immutable summary of a single drain pass. Each call to `sync` starts a
/// fresh tally; results are never merged.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    /// Operations dispatched during this pass
    pub processed: usize,
    /// Dispatches that succeeded
    pub succeeded: usize,
    /// Operations that failed this pass (including cascade failures)
    pub failed: usize,
    /// Per-operation failure details
    pub errors: Vec<SyncFailure>,
    /// Wall-clock time of the whole drain, in milliseconds
    pub duration_ms: u64,
    /// When the drain started
    pub started_at: DateTime<Utc>,
}

impl SyncResult {
    fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            processed: 0,
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
            duration_ms: 0,
            started_at,
        }
    }
}

// == Offline Queue ==
/// Pending-mutation queue with dependency tracking.
///
/// Terminal states live alongside the queue: `completed` holds ids that
/// reached terminal success, `failed` maps ids that exhausted their retry
/// budget (or were rejected outright) to their last error. Terminally failed
/// operations are surfaced, never silently retried.
#[derive(Debug, Default)]
pub struct OfflineQueue {
    /// Operations awaiting dispatch
    pending: Vec<OfflineOperation>,
    /// Ids that reached terminal success
    completed: HashSet<String>,
    /// Terminally failed ids with their last error
    failed: HashMap<String, String>,
}

impl OfflineQueue {
    // == Constructor ==
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    // == Enqueue ==
    /// Appends an operation. Scheduling order is decided at dispatch time:
    /// priority first (high before low), then FIFO by enqueue timestamp.
    pub fn enqueue(&mut self, op: OfflineOperation) {
        debug!(id = %op.id, entity_type = %op.entity_type, "operation enqueued");
        self.pending.push(op);
    }

    // == Dequeue Ready ==
    /// Returns the operations whose dependencies have all reached terminal
    /// success, in dispatch order. Does not remove them; removal happens on
    /// a terminal transition during `sync`.
    pub fn dequeue_ready(&self) -> Vec<OfflineOperation> {
        let mut ready: Vec<OfflineOperation> = self
            .pending
            .iter()
            .filter(|op| op.dependencies.iter().all(|dep| self.completed.contains(dep)))
            .cloned()
            .collect();
        ready.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
                .then_with(|| a.id.cmp(&b.id))
        });
        ready
    }

    // == Sync ==
    /// Drains ready operations against the transport, one at a time.
    ///
    /// Transport failures increment the operation's `retry_count`; the
    /// operation stays queued for the next pass while budget remains, and
    /// becomes terminally failed once the budget is exhausted. Backend
    /// rejections are terminal immediately and never retried. One failing
    /// operation never aborts the drain. Operations left permanently
    /// unsatisfiable by a terminal failure among their dependencies are
    /// cascade-failed. Calling `sync` on an empty queue is a no-op.
    pub async fn sync(&mut self, transport: &dyn SyncTransport) -> SyncResult {
        let started_at = Utc::now();
        if self.pending.is_empty() {
            return SyncResult::empty(started_at);
        }

        let clock = Instant::now();
        let mut result = SyncResult::empty(started_at);
        let mut attempted: HashSet<String> = HashSet::new();

        // Rounds: an operation whose dependency succeeds earlier in this
        // drain becomes ready in a later round.
        loop {
            let batch: Vec<OfflineOperation> = self
                .dequeue_ready()
                .into_iter()
                .filter(|op| !attempted.contains(&op.id))
                .collect();
            if batch.is_empty() {
                break;
            }

            for op in batch {
                attempted.insert(op.id.clone());
                result.processed += 1;

                match transport.dispatch(&op).await {
                    Ok(_) => {
                        debug!(id = %op.id, "operation replayed");
                        result.succeeded += 1;
                        self.mark_succeeded(&op.id);
                    }
                    Err(err) => {
                        let message = err.to_string();
                        result.failed += 1;
                        result.errors.push(SyncFailure {
                            operation_id: op.id.clone(),
                            error: message.clone(),
                        });

                        if err.is_retryable() {
                            self.record_retry(&op.id, &message);
                        } else {
                            warn!(id = %op.id, error = %message, "operation rejected");
                            self.mark_failed(&op.id, message);
                        }
                    }
                }
            }
        }

        self.cascade_failed_dependencies(&mut result);

        result.duration_ms = clock.elapsed().as_millis() as u64;
        info!(
            processed = result.processed,
            succeeded = result.succeeded,
            failed = result.failed,
            duration_ms = result.duration_ms,
            "offline queue drained"
        );
        result
    }

    // == Terminal State Queries ==
    /// Whether the id reached terminal success.
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// Whether the id is terminally failed, with its last error.
    pub fn failure(&self, id: &str) -> Option<&str> {
        self.failed.get(id).map(String::as_str)
    }

    /// All terminally failed operations, for surfacing to the user.
    pub fn failures(&self) -> &HashMap<String, String> {
        &self.failed
    }

    // == Length ==
    /// Number of operations still awaiting dispatch.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is awaiting dispatch.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending operations, in arrival order.
    pub fn pending_operations(&self) -> &[OfflineOperation] {
        &self.pending
    }

    fn mark_succeeded(&mut self, id: &str) {
        self.pending.retain(|op| op.id != id);
        self.completed.insert(id.to_string());
    }

    fn mark_failed(&mut self, id: &str, error: String) {
        self.pending.retain(|op| op.id != id);
        self.failed.insert(id.to_string(), error);
    }

    /// Bumps the retry counter; exhausting the budget is terminal.
    fn record_retry(&mut self, id: &str, error: &str) {
        let Some(op) = self.pending.iter_mut().find(|op| op.id == id) else {
            return;
        };
        op.retry_count += 1;
        if op.retry_policy.exhausted(op.retry_count) {
            warn!(id, retry_count = op.retry_count, "retry budget exhausted");
            self.mark_failed(id, error.to_string());
        } else {
            debug!(id, retry_count = op.retry_count, "operation re-queued");
        }
    }

    /// Terminally fails pending operations that depend (transitively) on a
    /// terminally failed operation; they can never become ready.
    fn cascade_failed_dependencies(&mut self, result: &mut SyncResult) {
        loop {
            let Some(victim) = self.pending.iter().find(|op| {
                op.dependencies.iter().any(|dep| self.failed.contains_key(dep))
            }) else {
                break;
            };
            let id = victim.id.clone();
            let dep = victim
                .dependencies
                .iter()
                .find(|dep| self.failed.contains_key(*dep))
                .cloned()
                .unwrap_or_default();
            let message = format!("dependency {} failed", dep);
            warn!(id = %id, error = %message, "cascade failure");
            result.failed += 1;
            result.errors.push(SyncFailure {
                operation_id: id.clone(),
                error: message.clone(),
            });
            self.mark_failed(&id, message);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{OperationKind, Priority};
    use crate::retry::RetryPolicy;
    use crate::transport::testing::MockTransport;

    fn op(entity_type: &str) -> OfflineOperation {
        OfflineOperation::new(OperationKind::Create, entity_type, None, None)
    }

    #[test]
    fn test_dequeue_ready_priority_then_fifo() {
        let mut queue = OfflineQueue::new();
        let mut low = op("a").with_priority(Priority::Low);
        let mut high = op("b").with_priority(Priority::High);
        let mut normal = op("c");
        low.timestamp = 1;
        high.timestamp = 3;
        normal.timestamp = 2;
        queue.enqueue(low.clone());
        queue.enqueue(high.clone());
        queue.enqueue(normal.clone());

        let ready = queue.dequeue_ready();
        let ids: Vec<&str> = ready.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![&high.id, &normal.id, &low.id]);
    }

    #[test]
    fn test_dequeue_ready_blocks_on_unmet_dependency() {
        let mut queue = OfflineQueue::new();
        let first = op("course");
        let second = op("course").with_dependencies(vec![first.id.clone()]);
        queue.enqueue(first.clone());
        queue.enqueue(second.clone());

        let ready = queue.dequeue_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, first.id);
    }

    #[tokio::test]
    async fn test_sync_empty_queue_is_noop() {
        let mut queue = OfflineQueue::new();
        let transport = MockTransport::ok();

        let result = queue.sync(&transport).await;
        assert_eq!(result.processed, 0);
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failed, 0);
        assert_eq!(transport.dispatched(), 0);
    }

    #[tokio::test]
    async fn test_sync_drains_dependents_in_same_pass() {
        let mut queue = OfflineQueue::new();
        let first = op("course");
        let second = op("course").with_dependencies(vec![first.id.clone()]);
        queue.enqueue(first.clone());
        queue.enqueue(second.clone());

        let transport = MockTransport::ok();
        let result = queue.sync(&transport).await;

        assert_eq!(result.processed, 2);
        assert_eq!(result.succeeded, 2);
        assert!(queue.is_empty());
        assert!(queue.is_completed(&first.id));
        assert!(queue.is_completed(&second.id));
    }

    #[tokio::test]
    async fn test_sync_failure_does_not_abort_batch() {
        let mut queue = OfflineQueue::new();
        let bad = op("broken");
        let good = op("course");
        queue.enqueue(bad.clone());
        queue.enqueue(good.clone());

        // Fails any dispatch for entity type "broken"
        let transport = MockTransport::failing_for("broken");
        let result = queue.sync(&transport).await;

        assert_eq!(result.processed, 2);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert!(queue.is_completed(&good.id));
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_is_terminal() {
        let mut queue = OfflineQueue::new();
        let doomed = op("broken").with_retry_policy(RetryPolicy::new(2));
        let id = doomed.id.clone();
        queue.enqueue(doomed);

        let transport = MockTransport::failing_for("broken");

        // First failing pass: retry budget not yet exhausted, stays queued
        let first = queue.sync(&transport).await;
        assert_eq!(first.failed, 1);
        assert_eq!(queue.len(), 1);
        assert!(queue.failure(&id).is_none());

        // Second failing pass: budget exhausted, terminal failure
        let second = queue.sync(&transport).await;
        assert_eq!(second.failed, 1);
        let entries: Vec<_> = second
            .errors
            .iter()
            .filter(|e| e.operation_id == id)
            .collect();
        assert_eq!(entries.len(), 1, "exactly one error entry for the id");
        assert!(queue.failure(&id).is_some());
        assert!(queue.is_empty());

        // Third pass: terminally failed operation is not re-attempted
        let third = queue.sync(&transport).await;
        assert_eq!(third.processed, 0);
    }

    #[tokio::test]
    async fn test_rejection_is_terminal_without_retries() {
        let mut queue = OfflineQueue::new();
        let rejected = op("course").with_retry_policy(RetryPolicy::new(5));
        let id = rejected.id.clone();
        queue.enqueue(rejected);

        let transport = MockTransport::rejecting();
        let result = queue.sync(&transport).await;

        assert_eq!(result.failed, 1);
        assert!(queue.failure(&id).is_some(), "rejected without retries");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_dependent_of_failed_operation_cascades() {
        let mut queue = OfflineQueue::new();
        let parent = op("broken").with_retry_policy(RetryPolicy::new(1));
        let child = op("course").with_dependencies(vec![parent.id.clone()]);
        let grandchild = op("course").with_dependencies(vec![child.id.clone()]);
        let (parent_id, child_id, grandchild_id) =
            (parent.id.clone(), child.id.clone(), grandchild.id.clone());
        queue.enqueue(parent);
        queue.enqueue(child);
        queue.enqueue(grandchild);

        let transport = MockTransport::failing_for("broken");
        let result = queue.sync(&transport).await;

        assert!(queue.failure(&parent_id).is_some());
        assert!(queue.failure(&child_id).is_some());
        assert!(queue.failure(&grandchild_id).is_some());
        assert!(queue.is_empty());
        // parent attempted, children cascade-failed without dispatch
        assert_eq!(result.processed, 1);
        assert_eq!(result.failed, 3);
    }

    #[tokio::test]
    async fn test_each_sync_result_is_fresh() {
        let mut queue = OfflineQueue::new();
        queue.enqueue(op("course"));

        let transport = MockTransport::ok();
        let first = queue.sync(&transport).await;
        assert_eq!(first.succeeded, 1);

        queue.enqueue(op("course"));
        let second = queue.sync(&transport).await;
        assert_eq!(second.processed, 1, "tally not merged with prior result");
        assert_eq!(second.succeeded, 1);
    }
}
