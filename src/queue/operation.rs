//! Offline Operation Module
//!
//! Mutation records held by the offline queue while the host is disconnected
//! or a request is in flight.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::cache::current_timestamp_ms;
use crate::retry::RetryPolicy;

// == Operation Kind ==
/// The mutation verb carried by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

// == Priority ==
/// Scheduling priority. Ordering matters: `Low < Normal < High`, and the
/// queue dispatches higher priorities first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

// == Offline Operation ==
/// A queued mutation awaiting replay against the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineOperation {
    /// Unique operation id
    pub id: String,
    /// Mutation verb
    pub kind: OperationKind,
    /// Entity type the mutation targets
    pub entity_type: String,
    /// Target entity id; None for creates
    pub entity_id: Option<String>,
    /// Request payload; None for deletes
    pub data: Option<Value>,
    /// Enqueue timestamp (Unix milliseconds); FIFO tie-break within a priority
    pub timestamp: u64,
    /// Dispatch attempts that have failed so far
    pub retry_count: u32,
    /// Retry budget shared with the optimistic tracker
    pub retry_policy: RetryPolicy,
    /// Scheduling priority
    pub priority: Priority,
    /// Ids of operations that must succeed before this one is dispatched
    pub dependencies: Vec<String>,
}

impl OfflineOperation {
    // == Constructor ==
    /// Creates a normal-priority operation with a fresh id and no dependencies.
    pub fn new(
        kind: OperationKind,
        entity_type: impl Into<String>,
        entity_id: Option<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            entity_type: entity_type.into(),
            entity_id,
            data,
            timestamp: current_timestamp_ms(),
            retry_count: 0,
            retry_policy: RetryPolicy::default(),
            priority: Priority::Normal,
            dependencies: Vec::new(),
        }
    }

    // == Builders ==
    /// Sets the scheduling priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the retry budget.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Declares operations that must succeed before this one runs.
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::Normal < Priority::High);
    }

    #[test]
    fn test_new_operation_defaults() {
        let op = OfflineOperation::new(OperationKind::Create, "course", None, None);
        assert_eq!(op.retry_count, 0);
        assert_eq!(op.priority, Priority::Normal);
        assert!(op.dependencies.is_empty());
        assert!(!op.id.is_empty());
    }

    #[test]
    fn test_builders() {
        let op = OfflineOperation::new(OperationKind::Delete, "room", Some("5".to_string()), None)
            .with_priority(Priority::High)
            .with_retry_policy(RetryPolicy::new(1))
            .with_dependencies(vec!["other-op".to_string()]);

        assert_eq!(op.priority, Priority::High);
        assert_eq!(op.retry_policy.max_retries, 1);
        assert_eq!(op.dependencies, vec!["other-op".to_string()]);
    }

    #[test]
    fn test_operation_ids_are_unique() {
        let a = OfflineOperation::new(OperationKind::Create, "course", None, None);
        let b = OfflineOperation::new(OperationKind::Create, "course", None, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&OperationKind::Update).unwrap();
        assert_eq!(json, "\"update\"");
    }
}
