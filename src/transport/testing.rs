//! Transport Test Doubles
//!
//! Deterministic in-memory transports used by this crate's tests and useful
//! to hosts testing their own sync wiring.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, SyncError};
use crate::queue::OfflineOperation;
use crate::transport::{FetchTransport, SyncTransport};

// == Mock Sync Transport ==
/// Scripted mutation transport.
#[derive(Debug, Default)]
pub struct MockTransport {
    dispatched: AtomicUsize,
    /// Entity type whose dispatches fail with a network error
    failing_entity_type: Option<String>,
    /// When set, every dispatch is rejected outright
    reject_all: bool,
}

impl MockTransport {
    /// Transport where every dispatch succeeds with `{"id": "42"}`.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Transport failing dispatches for one entity type with a network error.
    pub fn failing_for(entity_type: impl Into<String>) -> Self {
        Self {
            failing_entity_type: Some(entity_type.into()),
            ..Self::default()
        }
    }

    /// Transport rejecting every dispatch (backend validation error).
    pub fn rejecting() -> Self {
        Self {
            reject_all: true,
            ..Self::default()
        }
    }

    /// Number of dispatch attempts observed.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTransport for MockTransport {
    async fn dispatch(&self, op: &OfflineOperation) -> Result<Value> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        if self.reject_all {
            return Err(SyncError::Rejected("validation failed".to_string()));
        }
        if self
            .failing_entity_type
            .as_deref()
            .is_some_and(|t| t == op.entity_type)
        {
            return Err(SyncError::Network("connection refused".to_string()));
        }
        Ok(json!({ "id": "42" }))
    }
}

// == Mock Fetch Transport ==
/// Canned-response read transport with request recording.
#[derive(Debug)]
pub struct MockFetch {
    requests: AtomicUsize,
    last_params: Mutex<Vec<(String, String)>>,
    response: Value,
    fail: bool,
}

impl MockFetch {
    /// Transport answering every fetch with `response`.
    pub fn with_response(response: Value) -> Self {
        Self {
            requests: AtomicUsize::new(0),
            last_params: Mutex::new(Vec::new()),
            response,
            fail: false,
        }
    }

    /// Transport failing every fetch with a network error.
    pub fn failing() -> Self {
        Self {
            requests: AtomicUsize::new(0),
            last_params: Mutex::new(Vec::new()),
            response: Value::Null,
            fail: true,
        }
    }

    /// Number of fetches observed.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Query parameters of the most recent fetch.
    pub fn last_params(&self) -> Vec<(String, String)> {
        self.last_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchTransport for MockFetch {
    async fn fetch(&self, _endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = params.to_vec();
        if self.fail {
            return Err(SyncError::Network("connection reset".to_string()));
        }
        Ok(self.response.clone())
    }
}
