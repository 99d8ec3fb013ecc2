//! Storage trait for the resource store abstraction.

use async_trait::async_trait;
use odlm_core::{Kind, ObjectKey};
use serde_json::Value;

use crate::error::StorageError;
use crate::types::StoredObject;

/// The contract every store backend implements.
///
/// Objects are JSON documents carrying `kind` and `metadata.{namespace,name}`.
/// The store owns `metadata.uid`, `metadata.resourceVersion` and
/// `metadata.generation`. Implementations must be thread-safe.
///
/// # Example
///
/// ```ignore
/// async fn must_get(store: &dyn ResourceStore, key: &ObjectKey) -> Result<StoredObject, StorageError> {
///     store.get(key).await?.ok_or_else(|| StorageError::not_found(key))
/// }
/// ```
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Creates a new object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the key is taken.
    /// Returns `StorageError::InvalidObject` if `kind` or `metadata.name` is missing.
    async fn create(&self, object: &Value) -> Result<StoredObject, StorageError>;

    /// Reads an object by key.
    ///
    /// Returns `None` if the object does not exist; errors are reserved for
    /// infrastructure problems.
    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredObject>, StorageError>;

    /// Replaces an existing object.
    ///
    /// If `if_match` is provided, the write only succeeds when it equals the
    /// stored `resourceVersion`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    /// Returns `StorageError::VersionConflict` if `if_match` doesn't match.
    async fn update(
        &self,
        object: &Value,
        if_match: Option<&str>,
    ) -> Result<StoredObject, StorageError>;

    /// Deletes an object by key, returning its last stored state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    async fn delete(&self, key: &ObjectKey) -> Result<StoredObject, StorageError>;

    /// Lists objects of a kind, optionally restricted to one namespace,
    /// ordered by key.
    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
    ) -> Result<Vec<StoredObject>, StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<S: ResourceStore + ?Sized> ResourceStore for std::sync::Arc<S> {
    async fn create(&self, object: &Value) -> Result<StoredObject, StorageError> {
        (**self).create(object).await
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredObject>, StorageError> {
        (**self).get(key).await
    }

    async fn update(
        &self,
        object: &Value,
        if_match: Option<&str>,
    ) -> Result<StoredObject, StorageError> {
        (**self).update(object, if_match).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        (**self).delete(key).await
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
    ) -> Result<Vec<StoredObject>, StorageError> {
        (**self).list(kind, namespace).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
