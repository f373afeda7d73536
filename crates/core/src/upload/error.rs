//! Upload error types.

use thiserror::Error;

use filedock_shared::AppError;

use crate::storage::StorageError;

/// Upload operation errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A required field is missing or the payload is unacceptable.
    #[error("validation error: {0}")]
    Validation(String),

    /// The store holds more than one record for a key.
    #[error("expected at most one record for '{storage_key}', found {count}")]
    UnexpectedCardinality {
        /// The affected key.
        storage_key: String,
        /// Number of records found.
        count: usize,
    },

    /// No record matches the lookup.
    #[error("file not found: {0}")]
    NotFound(String),

    /// A record exists but its object is gone.
    #[error("object missing for record with key '{storage_key}'")]
    ObjectMissing {
        /// Key recorded in the metadata.
        storage_key: String,
    },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl UploadError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Validation(msg) => Self::Validation(msg),
            UploadError::UnexpectedCardinality { .. } => Self::DataIntegrity(err.to_string()),
            UploadError::NotFound(_) | UploadError::ObjectMissing { .. } => {
                Self::NotFound(err.to_string())
            }
            UploadError::Storage(e) => e.into(),
            UploadError::Repository(msg) => Self::Database(msg),
        }
    }
}
