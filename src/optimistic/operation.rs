//! Optimistic Operation Module
//!
//! In-flight mutation records and their status machine:
//! `pending → confirmed | failed`, `failed → pending` (user retry),
//! `pending | failed → rolled_back`. Confirmed and rolled_back are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::current_timestamp_ms;
use crate::queue::{OfflineOperation, OperationKind};
use crate::retry::RetryPolicy;

// == Operation Status ==
/// Lifecycle state of an optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Confirmed,
    Failed,
    RolledBack,
}

impl OperationStatus {
    /// Confirmed and rolled_back admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Confirmed | OperationStatus::RolledBack)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Confirmed => "confirmed",
            OperationStatus::Failed => "failed",
            OperationStatus::RolledBack => "rolled_back",
        };
        write!(f, "{}", name)
    }
}

// == Optimistic Operation ==
/// One tracked in-flight mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimisticOperation {
    /// Operation id; shared with the offline queue when the op originated there
    pub id: String,
    /// Mutation verb
    pub kind: OperationKind,
    /// Entity type the mutation targets
    pub entity_type: String,
    /// Target entity id; for creates this is filled on confirmation
    pub entity_id: Option<String>,
    /// Placeholder id shown in the UI for creates awaiting a server id
    pub temp_id: Option<String>,
    /// Current lifecycle state
    pub status: OperationStatus,
    /// When the mutation was begun (Unix milliseconds)
    pub timestamp: u64,
    /// Failed dispatch attempts; shared bookkeeping with the offline queue
    pub retry_count: u32,
    /// Retry budget shared with the offline queue
    pub retry_policy: RetryPolicy,
    /// Last failure message, present only in the failed state
    pub error: Option<String>,
}

impl OptimisticOperation {
    // == Constructor ==
    /// Creates a pending operation with a fresh id.
    pub fn new(
        kind: OperationKind,
        entity_type: impl Into<String>,
        entity_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            entity_type: entity_type.into(),
            entity_id,
            temp_id: None,
            status: OperationStatus::Pending,
            timestamp: current_timestamp_ms(),
            retry_count: 0,
            retry_policy: RetryPolicy::default(),
            error: None,
        }
    }

    // == From Offline ==
    /// Mirrors a queued operation, sharing its id and retry bookkeeping so
    /// the two views of one mutation never drift.
    pub fn from_offline(op: &OfflineOperation) -> Self {
        Self {
            id: op.id.clone(),
            kind: op.kind,
            entity_type: op.entity_type.clone(),
            entity_id: op.entity_id.clone(),
            temp_id: None,
            status: OperationStatus::Pending,
            timestamp: op.timestamp,
            retry_count: op.retry_count,
            retry_policy: op.retry_policy,
            error: None,
        }
    }

    // == Builders ==
    /// Attaches a placeholder id for a create awaiting its server id.
    pub fn with_temp_id(mut self, temp_id: impl Into<String>) -> Self {
        self.temp_id = Some(temp_id.into());
        self
    }

    /// Sets the retry budget.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}
