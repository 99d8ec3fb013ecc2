//! In-memory resource store backend.
//!
//! This crate provides an in-memory implementation of the `ResourceStore`
//! trait from `odlm-storage`, using a papaya lock-free HashMap for reads.
//!
//! # Example
//!
//! ```ignore
//! use odlm_db_memory::InMemoryStore;
//! use odlm_storage::ResourceStore;
//!
//! let store = InMemoryStore::new();
//! let created = store.create(&registry_json).await?;
//! assert_eq!(created.resource_version, "1");
//! ```

pub mod storage;

// Re-export the ResourceStore trait for convenience
pub use odlm_storage::{ResourceStore, StorageError, StoredObject};

pub use storage::InMemoryStore;

/// Type alias for a shareable store instance.
pub type DynStore = std::sync::Arc<dyn ResourceStore>;

/// Creates a new in-memory store instance.
pub fn create_store() -> DynStore {
    std::sync::Arc::new(InMemoryStore::new())
}
