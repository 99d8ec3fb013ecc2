//! Error types for the reconciliation engine.

use std::path::PathBuf;

use odlm_core::ObjectKey;
use odlm_storage::StorageError;

/// Failure to resolve a registry into its operand catalog.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The registry does not exist (or is being deleted).
    #[error("registry {key} not found")]
    NotFound { key: String },

    /// The registry exists but its operator list is malformed.
    #[error("registry {key} is invalid: {}", problems.join("; "))]
    Invalid { key: String, problems: Vec<String> },

    /// The store failed while reading.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ResolveError {
    pub fn not_found(key: &ObjectKey) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    pub fn invalid(key: &ObjectKey, problems: Vec<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            problems,
        }
    }
}

/// Errors surfaced by a reconcile pass.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Storage(#[from] StorageError),

    /// Status writes kept losing against concurrent writers.
    #[error("status write on {key} conflicted {attempts} times")]
    ConflictRetriesExhausted { key: String, attempts: u32 },

    /// One or more subscriptions could not be provisioned. The status was
    /// still written; the pass is retried.
    #[error("provisioning failed for {}", operands.join(", "))]
    Provisioning { operands: Vec<String> },

    #[error("reconcile pass exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("reconcile pass panicked: {message}")]
    Panicked { message: String },
}

impl ReconcileError {
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }

    /// Returns `true` if the key should back off and be retried.
    ///
    /// Anything else is a permanent error and is written to the config
    /// status immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::ConflictRetriesExhausted { .. }
            | Self::Provisioning { .. }
            | Self::Timeout { .. }
            | Self::Panicked { .. } => true,
        }
    }
}

/// Errors while loading start-up manifests.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest {path} is not an object or array of objects")]
    Shape { path: PathBuf },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
