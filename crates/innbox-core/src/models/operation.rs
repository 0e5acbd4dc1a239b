//! Queued mutation model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Logical collection names on the Remote Data Service.
pub mod collections {
    pub const BOOKINGS: &str = "bookings";
    pub const GUESTS: &str = "guests";
    pub const INVENTORY_ITEMS: &str = "inventory_items";
}

/// A unique identifier for a queued operation, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Create a new unique operation ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kind of mutation carried by a queued operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Lifecycle state of a queued operation.
///
/// A synced operation is physically removed from the store; there is no
/// persisted failed state, only still-pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Synced,
}

/// A durable, pending mutation awaiting application to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Unique identifier, caller-assigned
    pub id: OperationId,
    /// Logical collection being mutated (e.g. `bookings`)
    pub target_entity: String,
    /// Mutation kind
    pub action: Action,
    /// Record to insert, partial patch (must carry the record id), or bare id
    pub payload: Value,
    /// Enqueue timestamp (Unix ms); assigned by the queue when unset.
    /// Ordering key only, not a uniqueness guarantee.
    #[serde(default)]
    pub enqueued_at: Option<i64>,
    /// Lifecycle state
    pub status: OperationStatus,
    /// Failed apply attempts so far
    #[serde(default)]
    pub retry_count: u32,
    /// Earliest Unix-ms time the next apply attempt may run (backoff)
    #[serde(default)]
    pub next_attempt_at: i64,
}

impl QueuedOperation {
    /// Create a new operation ready for submission
    #[must_use]
    pub fn new(target_entity: impl Into<String>, action: Action, payload: Value) -> Self {
        Self {
            id: OperationId::new(),
            target_entity: target_entity.into(),
            action,
            payload,
            enqueued_at: None,
            status: OperationStatus::Pending,
            retry_count: 0,
            next_attempt_at: 0,
        }
    }

    /// Extract the id of the record this operation targets.
    ///
    /// Updates carry it as the payload object's `id` field; deletes may also
    /// use a bare string payload.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        match &self.payload {
            Value::String(id) if !id.trim().is_empty() => Some(id),
            Value::Object(map) => map
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.trim().is_empty()),
            _ => None,
        }
    }

    /// Check whether this operation mutates the bookings collection
    #[must_use]
    pub fn is_booking_mutation(&self) -> bool {
        self.target_entity == collections::BOOKINGS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_operation_id_unique() {
        let id1 = OperationId::new();
        let id2 = OperationId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_operation_id_parse() {
        let id = OperationId::new();
        let parsed: OperationId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_operation_id_time_sortable() {
        // UUID v7 ids created in a later millisecond must sort later
        let earlier = OperationId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = OperationId::new();
        assert!(earlier < later);
    }

    #[test]
    fn test_new_operation_is_pending() {
        let op = QueuedOperation::new(
            collections::BOOKINGS,
            Action::Insert,
            json!({"id": "b-1"}),
        );
        assert_eq!(op.status, OperationStatus::Pending);
        assert_eq!(op.enqueued_at, None);
        assert_eq!(op.retry_count, 0);
    }

    #[test]
    fn test_record_id_from_object() {
        let op = QueuedOperation::new(
            collections::GUESTS,
            Action::Update,
            json!({"id": "g-7", "name": "Ada"}),
        );
        assert_eq!(op.record_id(), Some("g-7"));
    }

    #[test]
    fn test_record_id_from_bare_string() {
        let op = QueuedOperation::new(collections::GUESTS, Action::Delete, json!("g-7"));
        assert_eq!(op.record_id(), Some("g-7"));
    }

    #[test]
    fn test_record_id_missing() {
        let op = QueuedOperation::new(
            collections::GUESTS,
            Action::Update,
            json!({"name": "Ada"}),
        );
        assert_eq!(op.record_id(), None);

        let blank = QueuedOperation::new(collections::GUESTS, Action::Delete, json!("  "));
        assert_eq!(blank.record_id(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let op = QueuedOperation::new(
            collections::INVENTORY_ITEMS,
            Action::Insert,
            json!({"id": "i-1", "quantity": 4}),
        );
        let value = serde_json::to_value(&op).unwrap();
        let back: QueuedOperation = serde_json::from_value(value).unwrap();
        assert_eq!(back, op);
    }
}
