//! EventedStore - a store wrapper that publishes watch events after writes.
//!
//! # Example
//!
//! ```ignore
//! use odlm_storage::EventedStore;
//! use odlm_core::events::EventBus;
//!
//! let bus = EventBus::new_shared();
//! let store = EventedStore::new(InMemoryStore::new(), bus.clone());
//! let mut watch = bus.subscribe();
//!
//! store.create(&registry_json).await?;
//! // watch now yields an Added event for the registry
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use odlm_core::events::{EventBus, WatchEvent};
use odlm_core::{Kind, ObjectKey};
use serde_json::Value;
use tracing::debug;

use crate::error::StorageError;
use crate::traits::ResourceStore;
use crate::types::StoredObject;

/// A store wrapper that publishes [`WatchEvent`]s after successful writes.
///
/// Events are published **after** the inner write succeeds, so every event
/// corresponds to a change that is visible to subsequent reads.
pub struct EventedStore<S: ResourceStore> {
    /// The inner store implementation.
    inner: S,
    /// The event bus.
    bus: Arc<EventBus>,
}

impl<S: ResourceStore> EventedStore<S> {
    /// Create a new evented store wrapper.
    pub fn new(inner: S, bus: Arc<EventBus>) -> Self {
        Self { inner, bus }
    }

    /// Get a reference to the inner store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a reference to the event bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    fn publish(&self, event: WatchEvent) {
        if !self.bus.has_subscribers() {
            return;
        }
        let event_type = event.event_type;
        let key = event.key.to_string();
        let count = self.bus.publish(event);
        debug!(
            key = %key,
            event = %event_type,
            subscribers = count,
            "Published watch event"
        );
    }
}

#[async_trait]
impl<S: ResourceStore> ResourceStore for EventedStore<S> {
    async fn create(&self, object: &Value) -> Result<StoredObject, StorageError> {
        let stored = self.inner.create(object).await?;
        self.publish(
            WatchEvent::added(stored.key.clone(), stored.object.clone())
                .with_version(stored.resource_version.clone()),
        );
        Ok(stored)
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredObject>, StorageError> {
        // Read operations don't publish events
        self.inner.get(key).await
    }

    async fn update(
        &self,
        object: &Value,
        if_match: Option<&str>,
    ) -> Result<StoredObject, StorageError> {
        let stored = self.inner.update(object, if_match).await?;
        self.publish(
            WatchEvent::modified(stored.key.clone(), stored.object.clone())
                .with_version(stored.resource_version.clone()),
        );
        Ok(stored)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        let last = self.inner.delete(key).await?;
        self.publish(WatchEvent::deleted(key.clone(), Some(last.object.clone())));
        Ok(last)
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
    ) -> Result<Vec<StoredObject>, StorageError> {
        self.inner.list(kind, namespace).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

impl<S: ResourceStore> std::fmt::Debug for EventedStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedStore")
            .field("backend", &self.inner.backend_name())
            .field("subscriber_count", &self.bus.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odlm_core::events::WatchEventType;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    /// Single-object store: enough to observe which writes publish events.
    #[derive(Default)]
    struct OneSlotStore {
        slot: Mutex<Option<StoredObject>>,
    }

    fn stored(object: &Value, version: &str) -> StoredObject {
        let now = OffsetDateTime::now_utc();
        StoredObject {
            key: ObjectKey::new(Kind::OperandConfig, "ns", "cfg"),
            uid: "uid-1".into(),
            resource_version: version.into(),
            generation: 1,
            object: object.clone(),
            created_at: now,
            last_updated: now,
        }
    }

    #[async_trait]
    impl ResourceStore for OneSlotStore {
        async fn create(&self, object: &Value) -> Result<StoredObject, StorageError> {
            let s = stored(object, "1");
            *self.slot.lock().unwrap() = Some(s.clone());
            Ok(s)
        }

        async fn get(&self, _key: &ObjectKey) -> Result<Option<StoredObject>, StorageError> {
            Ok(self.slot.lock().unwrap().clone())
        }

        async fn update(
            &self,
            object: &Value,
            if_match: Option<&str>,
        ) -> Result<StoredObject, StorageError> {
            let key = ObjectKey::new(Kind::OperandConfig, "ns", "cfg");
            if let Some(expected) = if_match {
                if expected != "1" {
                    return Err(StorageError::version_conflict(&key, expected, "1"));
                }
            }
            let s = stored(object, "2");
            *self.slot.lock().unwrap() = Some(s.clone());
            Ok(s)
        }

        async fn delete(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
            self.slot
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| StorageError::not_found(key))
        }

        async fn list(
            &self,
            _kind: Kind,
            _namespace: Option<&str>,
        ) -> Result<Vec<StoredObject>, StorageError> {
            Ok(self.slot.lock().unwrap().clone().into_iter().collect())
        }

        fn backend_name(&self) -> &'static str {
            "one-slot"
        }
    }

    #[tokio::test]
    async fn test_writes_publish_events() {
        let bus = EventBus::new_shared();
        let store = EventedStore::new(OneSlotStore::default(), bus.clone());
        let mut watch = bus.subscribe();
        let body = serde_json::json!({"kind": "OperandConfig"});

        store.create(&body).await.unwrap();
        store.update(&body, Some("1")).await.unwrap();
        store
            .delete(&ObjectKey::new(Kind::OperandConfig, "ns", "cfg"))
            .await
            .unwrap();

        let added = watch.recv().await.unwrap();
        assert_eq!(added.event_type, WatchEventType::Added);
        assert_eq!(added.resource_version.as_deref(), Some("1"));
        let modified = watch.recv().await.unwrap();
        assert_eq!(modified.event_type, WatchEventType::Modified);
        assert_eq!(modified.resource_version.as_deref(), Some("2"));
        let deleted = watch.recv().await.unwrap();
        assert!(deleted.is_deleted());
        assert!(deleted.object.is_some());
    }

    #[tokio::test]
    async fn test_failed_writes_publish_nothing() {
        let bus = EventBus::new_shared();
        let store = EventedStore::new(OneSlotStore::default(), bus.clone());
        let mut watch = bus.subscribe();

        let err = store
            .update(&serde_json::json!({}), Some("9"))
            .await
            .unwrap_err();
        assert!(err.is_version_conflict());
        assert!(watch.try_recv().is_err());
    }
}
