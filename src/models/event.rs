//! Remote Event Module
//!
//! The `entity_update` message pushed by the notification channel. The
//! synchronization layer's only contract with that channel is to invalidate
//! matching cache entries on receipt.

use serde::Deserialize;
use serde_json::Value;

use crate::queue::OperationKind;

// == Remote Event ==
/// A change notification for one entity.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEvent {
    /// What happened to the entity
    pub action: OperationKind,
    /// Entity type the change applies to
    pub entity_type: String,
    /// Id of the changed entity
    pub entity_id: String,
    /// New entity state, when the channel includes it
    #[serde(default)]
    pub data: Option<Value>,
    /// Username of the actor, when known
    #[serde(default)]
    pub user: Option<String>,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_deserializes_full_message() {
        let event: RemoteEvent = serde_json::from_value(json!({
            "action": "update",
            "entity_type": "course",
            "entity_id": "7",
            "data": {"id": 7, "name": "Algebra II"},
            "user": "jsmith"
        }))
        .unwrap();

        assert_eq!(event.action, OperationKind::Update);
        assert_eq!(event.entity_type, "course");
        assert_eq!(event.entity_id, "7");
        assert!(event.data.is_some());
        assert_eq!(event.user.as_deref(), Some("jsmith"));
    }

    #[test]
    fn test_event_data_and_user_optional() {
        let event: RemoteEvent = serde_json::from_value(json!({
            "action": "delete",
            "entity_type": "room",
            "entity_id": "3"
        }))
        .unwrap();

        assert_eq!(event.action, OperationKind::Delete);
        assert!(event.data.is_none());
        assert!(event.user.is_none());
    }
}
