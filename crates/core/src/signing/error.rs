//! Signing error types.

use thiserror::Error;

use filedock_shared::AppError;

/// Signed URL issuance errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Credentials are missing or unusable.
    #[error("signing configuration error: {0}")]
    Configuration(String),
}

impl SigningError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<SigningError> for AppError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::Configuration(msg) => Self::Configuration(msg),
        }
    }
}
