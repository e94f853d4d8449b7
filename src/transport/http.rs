//! HTTP Transport Module
//!
//! reqwest-backed transport speaking the backend's REST conventions:
//! `POST /{entity_type}/`, `PATCH /{entity_type}/{id}/`,
//! `DELETE /{entity_type}/{id}/`, and parameterized GETs for option lists.
//! Every request carries an explicit timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::queue::{OfflineOperation, OperationKind};
use crate::transport::{FetchTransport, SyncTransport};

// == Rest Transport ==
/// HTTP client for a REST backend.
#[derive(Debug, Clone)]
pub struct RestTransport {
    client: Client,
    base_url: String,
}

impl RestTransport {
    // == Constructor ==
    /// Creates a transport for `base_url` with the given per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a transport using the configured request timeout.
    pub fn from_config(base_url: impl Into<String>, config: &SyncConfig) -> Result<Self> {
        Self::new(base_url, config.request_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Self::into_payload(response).await
    }

    /// Maps the HTTP status onto the error taxonomy: 4xx is a backend
    /// rejection (terminal), everything else non-2xx is a network failure
    /// (retryable).
    async fn into_payload(response: Response) -> Result<Value> {
        let status = response.status();
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            return response
                .json::<Value>()
                .await
                .or(Ok(Value::Null));
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(SyncError::Rejected(format!("{}: {}", status, body)))
        } else {
            Err(SyncError::Network(format!("{}: {}", status, body)))
        }
    }
}

#[async_trait]
impl SyncTransport for RestTransport {
    async fn dispatch(&self, op: &OfflineOperation) -> Result<Value> {
        debug!(id = %op.id, kind = ?op.kind, entity_type = %op.entity_type, "dispatching");

        let require_id = || {
            op.entity_id.clone().ok_or_else(|| {
                SyncError::InvalidRequest(format!(
                    "{:?} operation on {} has no entity id",
                    op.kind, op.entity_type
                ))
            })
        };

        match op.kind {
            OperationKind::Create => {
                let url = self.url(&format!("{}/", op.entity_type));
                let mut request = self.client.request(Method::POST, url);
                if let Some(data) = &op.data {
                    request = request.json(data);
                }
                self.send(request).await
            }
            OperationKind::Update => {
                let id = require_id()?;
                let url = self.url(&format!("{}/{}/", op.entity_type, id));
                let mut request = self.client.request(Method::PATCH, url);
                if let Some(data) = &op.data {
                    request = request.json(data);
                }
                self.send(request).await
            }
            OperationKind::Delete => {
                let id = require_id()?;
                let url = self.url(&format!("{}/{}/", op.entity_type, id));
                self.send(self.client.request(Method::DELETE, url)).await
            }
        }
    }
}

#[async_trait]
impl FetchTransport for RestTransport {
    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        let url = self.url(endpoint);
        debug!(%url, "fetching");
        self.send(self.client.get(url).query(params)).await
    }
}
