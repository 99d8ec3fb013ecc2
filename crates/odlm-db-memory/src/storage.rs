use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use odlm_core::{Kind, ObjectKey};
use odlm_storage::{ResourceStore, StorageError, StoredObject};
use papaya::HashMap as PapayaHashMap;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;

/// Extracts the object identity from a JSON document.
fn extract_key(object: &Value) -> Result<ObjectKey, StorageError> {
    let kind = object
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| StorageError::invalid_object("Missing kind field"))?;
    let kind = Kind::from_str(kind)?;
    let metadata = object
        .get("metadata")
        .ok_or_else(|| StorageError::invalid_object("Missing metadata field"))?;
    let name = metadata
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| StorageError::invalid_object("Missing metadata.name field"))?;
    let namespace = metadata
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(ObjectKey::new(kind, namespace, name))
}

/// Writes the store-owned metadata fields into the document.
fn stamp_metadata(object: &Value, uid: &str, resource_version: &str, generation: i64) -> Value {
    let mut stamped = object.clone();
    if let Some(meta) = stamped.get_mut("metadata").and_then(Value::as_object_mut) {
        meta.insert("uid".to_string(), Value::String(uid.to_string()));
        meta.insert(
            "resourceVersion".to_string(),
            Value::String(resource_version.to_string()),
        );
        meta.insert("generation".to_string(), Value::from(generation));
    }
    stamped
}

/// In-memory resource store using a papaya lock-free HashMap.
///
/// This store provides:
/// - Lock-free concurrent reads via papaya::HashMap
/// - Writes serialized through a single gate, so version checks and the
///   write they guard are atomic with respect to other writers
/// - A monotonically increasing `resourceVersion` shared by all objects
/// - `generation` bumped only when `spec` changes
#[derive(Debug)]
pub struct InMemoryStore {
    data: Arc<PapayaHashMap<ObjectKey, StoredObject>>,
    version_counter: AtomicU64,
    write_gate: Mutex<()>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            version_counter: AtomicU64::new(1),
            write_gate: Mutex::new(()),
        }
    }

    /// Generates the next resource version.
    fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    /// Number of stored objects across all kinds.
    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.data.pin().contains_key(key)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn create(&self, object: &Value) -> Result<StoredObject, StorageError> {
        let key = extract_key(object)?;
        let _gate = self.write_gate.lock().await;

        let guard = self.data.pin();
        if guard.contains_key(&key) {
            return Err(StorageError::already_exists(&key));
        }

        let uid = uuid::Uuid::new_v4().to_string();
        let resource_version = self.next_version();
        let now = OffsetDateTime::now_utc();
        let stored = StoredObject {
            key: key.clone(),
            object: stamp_metadata(object, &uid, &resource_version, 1),
            uid,
            resource_version,
            generation: 1,
            created_at: now,
            last_updated: now,
        };
        guard.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredObject>, StorageError> {
        Ok(self.data.pin().get(key).cloned())
    }

    async fn update(
        &self,
        object: &Value,
        if_match: Option<&str>,
    ) -> Result<StoredObject, StorageError> {
        let key = extract_key(object)?;
        let _gate = self.write_gate.lock().await;

        let guard = self.data.pin();
        let existing = guard
            .get(&key)
            .ok_or_else(|| StorageError::not_found(&key))?;

        if let Some(expected) = if_match {
            if existing.resource_version != expected {
                return Err(StorageError::version_conflict(
                    &key,
                    expected,
                    existing.resource_version.clone(),
                ));
            }
        }

        let generation = if existing.object.get("spec") == object.get("spec") {
            existing.generation
        } else {
            existing.generation + 1
        };
        let resource_version = self.next_version();
        let stored = StoredObject {
            key: key.clone(),
            uid: existing.uid.clone(),
            object: stamp_metadata(object, &existing.uid, &resource_version, generation),
            resource_version,
            generation,
            created_at: existing.created_at,
            last_updated: OffsetDateTime::now_utc(),
        };
        guard.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        let _gate = self.write_gate.lock().await;
        let guard = self.data.pin();
        guard
            .remove(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
    ) -> Result<Vec<StoredObject>, StorageError> {
        let guard = self.data.pin();
        let mut items: Vec<StoredObject> = guard
            .iter()
            .filter(|(key, _)| key.kind == kind)
            .filter(|(key, _)| namespace.is_none_or(|ns| key.namespace == ns))
            .map(|(_, stored)| stored.clone())
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(items)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(name: &str, spec: Value) -> Value {
        json!({
            "kind": "OperandConfig",
            "metadata": {"name": name, "namespace": "ibm-common-services"},
            "spec": spec
        })
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryStore::new();
        let created = store
            .create(&config("common-service", json!({})))
            .await
            .unwrap();
        assert_eq!(created.generation, 1);
        assert_eq!(
            created.object["metadata"]["resourceVersion"],
            created.resource_version.as_str()
        );
        assert_eq!(created.object["metadata"]["uid"], created.uid.as_str());

        let read = store.get(&created.key).await.unwrap().unwrap();
        assert_eq!(read.resource_version, created.resource_version);
        assert!(store.contains(&created.key));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_malformed() {
        let store = InMemoryStore::new();
        store
            .create(&config("common-service", json!({})))
            .await
            .unwrap();
        let err = store
            .create(&config("common-service", json!({})))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());

        let err = store
            .create(&json!({"kind": "Pod", "metadata": {"name": "x"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidObject { .. }));

        let err = store
            .create(&json!({"kind": "OperandConfig", "metadata": {}}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidObject { .. }));
    }

    #[tokio::test]
    async fn test_conditional_update() {
        let store = InMemoryStore::new();
        let created = store
            .create(&config("common-service", json!({})))
            .await
            .unwrap();

        let mut body = created.object.clone();
        body["status"] = json!({"phase": "Init"});
        let updated = store
            .update(&body, Some(&created.resource_version))
            .await
            .unwrap();
        assert_ne!(updated.resource_version, created.resource_version);
        assert_eq!(updated.uid, created.uid);

        // A writer still holding the first version loses.
        let err = store
            .update(&body, Some(&created.resource_version))
            .await
            .unwrap_err();
        assert!(err.is_version_conflict());

        // Unconditional writes always land.
        store.update(&body, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_generation_tracks_spec_changes_only() {
        let store = InMemoryStore::new();
        let created = store
            .create(&config("common-service", json!({"services": []})))
            .await
            .unwrap();

        let mut body = created.object.clone();
        body["status"] = json!({"phase": "Running"});
        let status_write = store.update(&body, None).await.unwrap();
        assert_eq!(status_write.generation, 1);

        body["spec"] = json!({"services": [{"name": "etcd"}]});
        let spec_write = store.update(&body, None).await.unwrap();
        assert_eq!(spec_write.generation, 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = InMemoryStore::new();
        let err = store
            .update(&config("missing", json!({})), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let key = ObjectKey::new(Kind::OperandConfig, "ibm-common-services", "missing");
        assert!(store.delete(&key).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_by_kind_and_namespace() {
        let store = InMemoryStore::new();
        store.create(&config("b", json!({}))).await.unwrap();
        store.create(&config("a", json!({}))).await.unwrap();
        store
            .create(&json!({
                "kind": "OperandConfig",
                "metadata": {"name": "c", "namespace": "other"}
            }))
            .await
            .unwrap();
        store
            .create(&json!({
                "kind": "OperandRegistry",
                "metadata": {"name": "a", "namespace": "ibm-common-services"}
            }))
            .await
            .unwrap();

        let all = store.list(Kind::OperandConfig, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let scoped = store
            .list(Kind::OperandConfig, Some("ibm-common-services"))
            .await
            .unwrap();
        let names: Vec<&str> = scoped.iter().map(|s| s.key.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_returns_last_state() {
        let store = InMemoryStore::new();
        let created = store.create(&config("gone", json!({}))).await.unwrap();
        let last = store.delete(&created.key).await.unwrap();
        assert_eq!(last.uid, created.uid);
        assert!(store.get(&created.key).await.unwrap().is_none());
        assert!(store.is_empty());
    }
}
