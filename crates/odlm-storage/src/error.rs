//! Storage error types for the resource store abstraction.

use std::fmt;

use odlm_core::ObjectKey;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object was not found.
    #[error("object not found: {key}")]
    NotFound {
        /// `Kind/namespace/name` of the missing object.
        key: String,
    },

    /// A conditional write lost against a concurrent writer.
    #[error("version conflict on {key}: expected {expected}, found {actual}")]
    VersionConflict {
        /// `Kind/namespace/name` of the contended object.
        key: String,
        /// The version the writer read.
        expected: String,
        /// The version currently stored.
        actual: String,
    },

    /// Attempted to create an object that already exists.
    #[error("object already exists: {key}")]
    AlreadyExists {
        /// `Kind/namespace/name` of the existing object.
        key: String,
    },

    /// The object is malformed.
    #[error("invalid object: {message}")]
    InvalidObject {
        /// Description of why the object is invalid.
        message: String,
    },

    /// The backend could not serve the request right now.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(key: &ObjectKey) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    #[must_use]
    pub fn version_conflict(
        key: &ObjectKey,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::VersionConflict {
            key: key.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    #[must_use]
    pub fn already_exists(key: &ObjectKey) -> Self {
        Self::AlreadyExists {
            key: key.to_string(),
        }
    }

    /// Creates a new `InvalidObject` error.
    #[must_use]
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::InvalidObject {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// A conditional write lost; re-read and recompute.
    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` if retrying the same operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Conflict | ErrorCategory::Unavailable | ErrorCategory::NotFound
        )
    }

    /// Coarse class used in log fields and retry decisions.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::VersionConflict { .. } => ErrorCategory::Conflict,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidObject { .. } => ErrorCategory::Validation,
            Self::Unavailable { .. } => ErrorCategory::Unavailable,
        }
    }
}

impl From<odlm_core::CoreError> for StorageError {
    fn from(err: odlm_core::CoreError) -> Self {
        Self::invalid_object(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    /// Version or existence conflict.
    Conflict,
    Validation,
    Unavailable,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
