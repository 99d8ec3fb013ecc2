use thiserror::Error;

/// Core error types for resource model operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Invalid object: {message}")]
    InvalidObject { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new UnknownKind error
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind(kind.into())
    }

    /// Create a new InvalidKey error
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }

    /// Create a new InvalidObject error
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::InvalidObject {
            message: message.into(),
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
