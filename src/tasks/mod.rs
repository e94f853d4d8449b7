//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the engine is live.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
