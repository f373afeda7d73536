//! Pre-signed upload URLs for an external object store.

mod error;
mod issuer;

pub use error::SigningError;
pub use issuer::{SignedUpload, SignedUrlIssuer};
