//! Transport Module
//!
//! Network seams for the synchronization layer. The queue and engine talk to
//! `SyncTransport`, the related-data resolver to `FetchTransport`; hosts plug
//! in the reqwest-backed `RestTransport` or their own implementation.

mod http;
pub mod testing;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::queue::OfflineOperation;

pub use http::RestTransport;

// == Sync Transport ==
/// Dispatches a mutation against the backend.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Sends one mutation, returning the backend's response payload
    /// (`Value::Null` for responses without a body).
    async fn dispatch(&self, op: &OfflineOperation) -> Result<Value>;
}

// == Fetch Transport ==
/// Issues a read against the backend.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    /// Fetches `endpoint` with the given query parameters, returning the raw
    /// JSON payload.
    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value>;
}
