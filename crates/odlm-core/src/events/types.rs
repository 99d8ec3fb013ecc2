//! Watch event types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::meta::{Kind, ObjectKey};

/// Type of change observed on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchEventType {
    /// Object was created
    Added,
    /// Object was updated
    Modified,
    /// Object was deleted
    Deleted,
}

impl WatchEventType {
    /// Returns the string representation of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventType::Added => "added",
            WatchEventType::Modified => "modified",
            WatchEventType::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for WatchEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event representing a change to a stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Type of change (added, modified, deleted)
    pub event_type: WatchEventType,
    /// Identity of the changed object
    pub key: ObjectKey,
    /// Resource version after the change, if the object still exists
    pub resource_version: Option<String>,
    /// The object as written (for deletions, the last stored state)
    pub object: Option<serde_json::Value>,
    /// Timestamp of the event
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl WatchEvent {
    /// Create a new watch event.
    pub fn new(
        event_type: WatchEventType,
        key: ObjectKey,
        object: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            key,
            resource_version: None,
            object,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Create an "added" event.
    pub fn added(key: ObjectKey, object: serde_json::Value) -> Self {
        Self::new(WatchEventType::Added, key, Some(object))
    }

    /// Create a "modified" event.
    pub fn modified(key: ObjectKey, object: serde_json::Value) -> Self {
        Self::new(WatchEventType::Modified, key, Some(object))
    }

    /// Create a "deleted" event carrying the last known state, if any.
    pub fn deleted(key: ObjectKey, last_state: Option<serde_json::Value>) -> Self {
        Self::new(WatchEventType::Deleted, key, last_state)
    }

    /// Set the resource version.
    pub fn with_version(mut self, resource_version: impl Into<String>) -> Self {
        self.resource_version = Some(resource_version.into());
        self
    }

    pub fn kind(&self) -> Kind {
        self.key.kind
    }

    pub fn is_deleted(&self) -> bool {
        self.event_type == WatchEventType::Deleted
    }

    /// Decode the carried object as a typed resource.
    pub fn decode<T: crate::meta::Resource>(&self) -> Option<T> {
        if self.key.kind != T::KIND {
            return None;
        }
        self.object
            .as_ref()
            .and_then(|value| T::from_object(value.clone()).ok())
    }
}
