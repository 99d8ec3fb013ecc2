//! Store wrapper that injects failures per kind.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use odlm_core::{Kind, ObjectKey};
use odlm_db_memory::InMemoryStore;
use odlm_storage::{ResourceStore, StorageError, StoredObject};
use serde_json::Value;

#[derive(Default)]
pub struct FaultyStore {
    inner: InMemoryStore,
    failing_creates: DashSet<Kind>,
    conflicting_updates: DashMap<Kind, u32>,
    slow_gets: DashMap<Kind, Duration>,
    gets: DashMap<Kind, usize>,
}

fn key_of(object: &Value) -> Option<ObjectKey> {
    let kind = object.get("kind")?.as_str()?.parse::<Kind>().ok()?;
    let metadata = object.get("metadata")?;
    let name = metadata.get("name")?.as_str()?;
    let namespace = metadata
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(ObjectKey::new(kind, namespace, name))
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every create of `kind` fails as unavailable until healed.
    pub fn fail_creates(&self, kind: Kind) {
        self.failing_creates.insert(kind);
    }

    pub fn heal_creates(&self, kind: Kind) {
        self.failing_creates.remove(&kind);
    }

    /// The next `times` updates of `kind` lose a version conflict.
    pub fn conflict_updates(&self, kind: Kind, times: u32) {
        self.conflicting_updates.insert(kind, times);
    }

    /// Every get of `kind` sleeps for `delay` first.
    pub fn slow_gets(&self, kind: Kind, delay: Duration) {
        self.slow_gets.insert(kind, delay);
    }

    pub fn gets(&self, kind: Kind) -> usize {
        self.gets.get(&kind).map(|n| *n).unwrap_or(0)
    }

    pub fn reset_gets(&self) {
        self.gets.clear();
    }

    fn take_conflict(&self, kind: Kind) -> bool {
        match self.conflicting_updates.get_mut(&kind) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ResourceStore for FaultyStore {
    async fn create(&self, object: &Value) -> Result<StoredObject, StorageError> {
        if let Some(key) = key_of(object) {
            if self.failing_creates.contains(&key.kind) {
                return Err(StorageError::unavailable(format!("cannot create {key}")));
            }
        }
        self.inner.create(object).await
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredObject>, StorageError> {
        *self.gets.entry(key.kind).or_default() += 1;
        let delay = self.slow_gets.get(&key.kind).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get(key).await
    }

    async fn update(
        &self,
        object: &Value,
        if_match: Option<&str>,
    ) -> Result<StoredObject, StorageError> {
        if let Some(key) = key_of(object) {
            if self.take_conflict(key.kind) {
                return Err(StorageError::version_conflict(
                    &key,
                    if_match.unwrap_or("*"),
                    "newer",
                ));
            }
        }
        self.inner.update(object, if_match).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        self.inner.delete(key).await
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
    ) -> Result<Vec<StoredObject>, StorageError> {
        self.inner.list(kind, namespace).await
    }

    fn backend_name(&self) -> &'static str {
        "faulty-memory"
    }
}
