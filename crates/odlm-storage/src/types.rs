//! Storage types for the resource store abstraction.

use odlm_core::ObjectKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// An object as stored in the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    /// The object identity.
    pub key: ObjectKey,
    /// Store-assigned unique id, stable across updates.
    pub uid: String,
    /// Version of this specific write; changes on every write.
    pub resource_version: String,
    /// Incremented only when `spec` changes.
    pub generation: i64,
    /// The full object as JSON, with store-owned metadata filled in.
    pub object: Value,
    /// When the object was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When this version was written.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}
