//! Related Data Resolver Module
//!
//! Debounced option-list fetches for relation fields. Rapid search input
//! collapses into a single request (last-request-wins); resolved lists are
//! memoized through the cache so repeated lookups skip the network.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheManager, SetOptions};
use crate::error::Result;
use crate::models::list_payload;
use crate::transport::FetchTransport;

/// Cache bucket memoized option lists live in.
const CACHE_ENTITY_TYPE: &str = "related";

// == Related Query ==
/// Configuration of one relation field's option source.
#[derive(Debug, Clone)]
pub struct RelatedQuery {
    /// Backend endpoint serving the options; None disables the field
    pub endpoint: Option<String>,
    /// Field rendered as the option label
    pub display_field: Option<String>,
    /// Field used as the option value
    pub value_field: String,
    /// Fixed query parameters sent with every request
    pub filter: Vec<(String, String)>,
    /// Server-side ordering expression
    pub sort: Option<String>,
    /// Maximum number of options requested
    pub limit: Option<usize>,
    /// Fields the backend should match the search term against
    pub search_fields: Vec<String>,
    /// Debounce window for search input, in milliseconds
    pub debounce_ms: u64,
}

impl Default for RelatedQuery {
    fn default() -> Self {
        Self {
            endpoint: None,
            display_field: None,
            value_field: "id".to_string(),
            filter: Vec::new(),
            sort: None,
            limit: None,
            search_fields: Vec::new(),
            debounce_ms: 300,
        }
    }
}

// == Related Option ==
/// One normalized option for a relation field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedOption {
    /// Value submitted when the option is chosen
    pub value: Value,
    /// Human-readable label
    pub label: String,
}

// == Related Data Resolver ==
/// Debounced, memoized option-list fetcher for one relation field.
pub struct RelatedDataResolver {
    transport: Arc<dyn FetchTransport>,
    cache: Arc<RwLock<CacheManager<Value>>>,
    query: RelatedQuery,
    /// Bumped on every search; stale generations abandon their work
    generation: AtomicU64,
}

impl RelatedDataResolver {
    // == Constructor ==
    /// Creates a resolver for one relation field.
    pub fn new(
        transport: Arc<dyn FetchTransport>,
        cache: Arc<RwLock<CacheManager<Value>>>,
        query: RelatedQuery,
    ) -> Self {
        Self {
            transport,
            cache,
            query,
            generation: AtomicU64::new(0),
        }
    }

    // == Search ==
    /// Resolves options for the given search term.
    ///
    /// Waits out the debounce window first; a newer search arriving in the
    /// meantime supersedes this one, which then resolves to `Ok(None)`
    /// without touching the network. Results arriving after a newer search
    /// began are likewise discarded. A missing endpoint means the field is
    /// disabled: empty options, not an error. Network failures propagate.
    pub async fn search(&self, term: &str) -> Result<Option<Vec<RelatedOption>>> {
        let Some(endpoint) = self.query.endpoint.clone() else {
            return Ok(Some(Vec::new()));
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(self.query.debounce_ms)).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(term, "search superseded during debounce");
            return Ok(None);
        }

        let params = self.build_params(term);
        let cache_key = memo_key(&endpoint, &params);
        if let Some(cached) = self.cache.write().await.get(CACHE_ENTITY_TYPE, &cache_key) {
            if let Ok(options) = serde_json::from_value::<Vec<RelatedOption>>(cached) {
                debug!(term, "options served from cache");
                return Ok(Some(options));
            }
        }

        let payload = self.transport.fetch(&endpoint, &params).await?;
        let options = self.normalize(&payload);

        if let Ok(value) = serde_json::to_value(&options) {
            // Keys over the length limit fail validation; skip memoization then
            let _ = self.cache.write().await.set(
                CACHE_ENTITY_TYPE,
                &cache_key,
                value,
                SetOptions::default(),
            );
        }

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(term, "stale result discarded");
            return Ok(None);
        }
        Ok(Some(options))
    }

    // == Normalize ==
    /// Maps a flat-array or paginated response into `{value, label}` options.
    fn normalize(&self, payload: &Value) -> Vec<RelatedOption> {
        list_payload(payload)
            .iter()
            .map(|item| RelatedOption {
                value: item.get(&self.query.value_field).cloned().unwrap_or(Value::Null),
                label: self.option_label(item),
            })
            .collect()
    }

    /// Label resolution order: configured display field, then "name", then
    /// "title", then the stringified value field.
    fn option_label(&self, item: &Value) -> String {
        if let Some(field) = &self.query.display_field {
            if let Some(label) = field_string(item, field) {
                return label;
            }
        }
        field_string(item, "name")
            .or_else(|| field_string(item, "title"))
            .or_else(|| field_string(item, &self.query.value_field))
            .unwrap_or_default()
    }

    fn build_params(&self, term: &str) -> Vec<(String, String)> {
        let mut params = self.query.filter.clone();
        if !term.is_empty() {
            params.push(("search".to_string(), term.to_string()));
        }
        if !self.query.search_fields.is_empty() {
            params.push((
                "search_fields".to_string(),
                self.query.search_fields.join(","),
            ));
        }
        if let Some(sort) = &self.query.sort {
            params.push(("ordering".to_string(), sort.clone()));
        }
        if let Some(limit) = self.query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

/// Cache key covering the endpoint and the full parameter set.
fn memo_key(endpoint: &str, params: &[(String, String)]) -> String {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}?{}", endpoint, query.join("&"))
}

/// Field value as a display string; null and absent yield None.
fn field_string(item: &Value, field: &str) -> Option<String> {
    match item.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}
