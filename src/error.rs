//! Error types for the synchronization layer
//!
//! Provides unified error handling using thiserror.
//!
//! A cache miss is not an error anywhere in this crate: lookups signal absence
//! with `Option`/`None`. The variants below cover the failures that need
//! distinct handling downstream, in particular the split between retryable
//! network failures and terminal backend rejections.

use thiserror::Error;

// == Sync Error Enum ==
/// Unified error type for the synchronization layer.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport-level failure (connection refused, timeout, 5xx). Retryable.
    #[error("Network error: {0}")]
    Network(String),

    /// Backend validation or business rejection (4xx). Never auto-retried.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// An operation state transition the status machine does not allow.
    #[error("Invalid transition for operation {id}: cannot {action} from {from}")]
    InvalidTransition {
        /// Operation id the transition was attempted on
        id: String,
        /// Status the operation currently holds
        from: String,
        /// The attempted action (confirm, fail, retry, rollback)
        action: &'static str,
    },

    /// Referenced operation id is not tracked.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Locally detected invalid input (empty key, malformed endpoint, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SyncError {
    // == Retryability ==
    /// Whether the queue may re-dispatch an operation that failed with this
    /// error. Only transport failures qualify; rejections are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the synchronization layer.
pub type Result<T> = std::result::Result<T, SyncError>;
