//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required input was missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Metadata record or stored object not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored data violates an invariant (e.g. duplicate records for one key).
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    /// Required configuration is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Object storage failed after the client exhausted its retries.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::DataIntegrity(_)
            | Self::Configuration(_)
            | Self::Storage(_)
            | Self::Database(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::DataIntegrity(_) => "UNEXPECTED_CARDINALITY",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to a client.
    ///
    /// Backend failures are collapsed into a generic message; the detail is
    /// only meant for logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::NotFound(msg) | Self::DataIntegrity(msg) => msg.clone(),
            Self::Configuration(_) => "Server is not configured for this operation".to_string(),
            Self::Storage(_) => "Storage operation failed".to_string(),
            Self::Database(_) | Self::Internal(_) => "An error occurred".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
