//! Typed access on top of a [`ResourceStore`].

use odlm_core::{Kind, ObjectKey, Resource};
use tracing::warn;

use crate::DynStore;
use crate::error::StorageError;
use crate::types::StoredObject;

/// A decoded object together with the store bookkeeping needed for
/// conditional writes.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub resource_version: String,
    pub generation: i64,
    pub object: T,
}

impl<T: Resource> Versioned<T> {
    /// Decodes a stored object as `T`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidObject` if the kind differs or the
    /// document does not match `T`.
    pub fn decode(stored: StoredObject) -> Result<Self, StorageError> {
        if stored.key.kind != T::KIND {
            return Err(StorageError::invalid_object(format!(
                "expected {}, got {}",
                T::KIND,
                stored.key
            )));
        }
        let object = T::from_object(stored.object)
            .map_err(|e| StorageError::invalid_object(format!("{}: {e}", stored.key)))?;
        Ok(Self {
            resource_version: stored.resource_version,
            generation: stored.generation,
            object,
        })
    }

    pub fn key(&self) -> ObjectKey {
        self.object.key()
    }
}

/// Typed view over a shared store.
#[derive(Clone)]
pub struct TypedStore {
    store: DynStore,
}

impl TypedStore {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// The untyped store underneath.
    pub fn raw(&self) -> &DynStore {
        &self.store
    }

    /// Reads and decodes an object.
    pub async fn get<T: Resource>(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<Versioned<T>>, StorageError> {
        let key = if key.kind == T::KIND {
            key.clone()
        } else {
            key.with_kind(T::KIND)
        };
        match self.store.get(&key).await? {
            Some(stored) => Versioned::decode(stored).map(Some),
            None => Ok(None),
        }
    }

    /// Lists and decodes every object of `T`'s kind.
    ///
    /// Documents that fail to decode are skipped with a warning; one malformed
    /// object must not hide the rest.
    pub async fn list<T: Resource>(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<Versioned<T>>, StorageError> {
        let stored = self.store.list(T::KIND, namespace).await?;
        let mut decoded = Vec::with_capacity(stored.len());
        for item in stored {
            let key = item.key.clone();
            match Versioned::<T>::decode(item) {
                Ok(v) => decoded.push(v),
                Err(e) => warn!(key = %key, error = %e, "Skipping undecodable object"),
            }
        }
        Ok(decoded)
    }

    /// Lists the keys of every object of a kind.
    pub async fn list_keys(&self, kind: Kind) -> Result<Vec<ObjectKey>, StorageError> {
        Ok(self
            .store
            .list(kind, None)
            .await?
            .into_iter()
            .map(|s| s.key)
            .collect())
    }

    pub async fn create<T: Resource>(&self, resource: &T) -> Result<Versioned<T>, StorageError> {
        let body = resource.to_object()?;
        Versioned::decode(self.store.create(&body).await?)
    }

    /// Replaces an object, guarded by `if_match` when given.
    pub async fn update<T: Resource>(
        &self,
        resource: &T,
        if_match: Option<&str>,
    ) -> Result<Versioned<T>, StorageError> {
        let body = resource.to_object()?;
        Versioned::decode(self.store.update(&body, if_match).await?)
    }

    pub async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        self.store.delete(key).await.map(|_| ())
    }
}

impl std::fmt::Debug for TypedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedStore")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}
