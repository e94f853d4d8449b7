//! Offline Queue Module
//!
//! Durable ordering and replay of mutations recorded while offline or while
//! a request is in flight.

mod operation;
mod queue;

// Re-export public types
pub use operation::{OfflineOperation, OperationKind, Priority};
pub use queue::{OfflineQueue, SyncFailure, SyncResult};
