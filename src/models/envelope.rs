//! Response Envelope Module
//!
//! Normalizers for the backend's two response conventions: DRF-style
//! paginated lists (`{results, count, next, previous}`) and the canonical
//! `{data}` envelope. Callers get plain payloads either way.

use serde::Deserialize;
use serde_json::Value;

// == List Envelope ==
/// DRF-style paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope {
    /// Page of results
    pub results: Vec<Value>,
    /// Total result count across pages
    #[serde(default)]
    pub count: Option<u64>,
    /// URL of the next page, if any
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page, if any
    #[serde(default)]
    pub previous: Option<String>,
}

// == List Payload ==
/// Extracts the item list from a response body.
///
/// Accepts a bare array, a paginated `{results: [...]}` envelope, or a
/// `{data: [...]}` envelope. Anything else yields an empty list.
pub fn list_payload(value: &Value) -> Vec<Value> {
    if let Some(items) = value.as_array() {
        return items.clone();
    }
    if let Some(items) = value.get("results").and_then(Value::as_array) {
        return items.clone();
    }
    if let Some(items) = value.get("data").and_then(Value::as_array) {
        return items.clone();
    }
    Vec::new()
}

// == Entity Payload ==
/// Unwraps a single-entity response: `{data: {...}}` yields the inner
/// object, anything else passes through unchanged.
pub fn entity_payload(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_payload_bare_array() {
        let value = json!([{"id": 1}, {"id": 2}]);
        assert_eq!(list_payload(&value).len(), 2);
    }

    #[test]
    fn test_list_payload_paginated() {
        let value = json!({
            "results": [{"id": 1}],
            "count": 10,
            "next": "http://api/course/?page=2",
            "previous": null
        });
        let items = list_payload(&value);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], 1);
    }

    #[test]
    fn test_list_payload_data_envelope() {
        let value = json!({"data": [{"id": 3}]});
        assert_eq!(list_payload(&value)[0]["id"], 3);
    }

    #[test]
    fn test_list_payload_unrecognized_shape() {
        assert!(list_payload(&json!({"detail": "ok"})).is_empty());
        assert!(list_payload(&json!(null)).is_empty());
    }

    #[test]
    fn test_entity_payload_unwraps_data() {
        let value = json!({"data": {"id": 5, "name": "Algebra"}});
        let entity = entity_payload(value);
        assert_eq!(entity["name"], "Algebra");
    }

    #[test]
    fn test_entity_payload_passthrough() {
        let value = json!({"id": 5, "name": "Algebra"});
        assert_eq!(entity_payload(value.clone()), value);
    }

    #[test]
    fn test_list_envelope_deserializes() {
        let envelope: ListEnvelope = serde_json::from_value(json!({
            "results": [{"id": 1}],
            "count": 1
        }))
        .unwrap();
        assert_eq!(envelope.results.len(), 1);
        assert_eq!(envelope.count, Some(1));
        assert!(envelope.next.is_none());
    }
}
