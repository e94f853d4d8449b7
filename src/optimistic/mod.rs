//! Optimistic Update Module
//!
//! Tracks in-flight mutations whose effects are shown to the user before the
//! backend confirms them, with retry and rollback as the user-facing
//! recovery actions.

mod operation;
mod tracker;

// Re-export public types
pub use operation::{OperationStatus, OptimisticOperation};
pub use tracker::OptimisticTracker;
