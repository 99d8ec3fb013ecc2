//! # odlm-storage
//!
//! Resource store abstraction for the operand lifecycle manager.
//!
//! This crate defines the contract every store backend implements; backends
//! live in separate crates (see `odlm-db-memory`).
//!
//! ## Overview
//!
//! The main trait is [`ResourceStore`], a consistent key-value store of JSON
//! objects keyed by `(kind, namespace, name)` with:
//! - create / get / delete
//! - conditional update guarded by `resourceVersion` (optimistic concurrency)
//! - list by kind and namespace
//!
//! [`EventedStore`] adds watch support by publishing a
//! [`WatchEvent`](odlm_core::events::WatchEvent) after every successful write,
//! and [`TypedStore`] layers typed (de)serialization on top.
//!
//! ## Example
//!
//! ```ignore
//! use odlm_storage::{TypedStore, StorageError};
//! use odlm_core::{Kind, ObjectKey, OperandConfig};
//!
//! async fn phase_of(store: &TypedStore, key: &ObjectKey) -> Result<String, StorageError> {
//!     let config = store
//!         .get::<OperandConfig>(key)
//!         .await?
//!         .ok_or_else(|| StorageError::not_found(key))?;
//!     Ok(config.object.status.phase.to_string())
//! }
//! ```

mod error;
pub mod evented;
mod traits;
pub mod typed;
mod types;

// Re-export everything from submodules
pub use error::{ErrorCategory, StorageError};
pub use evented::EventedStore;
pub use traits::ResourceStore;
pub use typed::{TypedStore, Versioned};
pub use types::StoredObject;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn ResourceStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use odlm_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::evented::EventedStore;
    pub use crate::traits::ResourceStore;
    pub use crate::typed::{TypedStore, Versioned};
    pub use crate::types::StoredObject;
    pub use crate::{DynStore, StorageResult};
}
