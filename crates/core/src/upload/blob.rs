//! Anonymous blob uploads.
//!
//! Blobs are stored under a generated key and have no metadata record.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use super::error::UploadError;
use super::types::META_ORIGINAL_NAME;
use crate::storage::{ObjectWrite, StorageService, base_name};

/// Key prefix reserved for blobs. The orphan sweep skips it.
pub const BLOB_PREFIX: &str = "blobstore/";

/// Stores anonymous uploads under generated keys.
pub struct BlobStoreService {
    storage: Arc<StorageService>,
}

impl BlobStoreService {
    /// Create a new blob store service.
    #[must_use]
    pub fn new(storage: Arc<StorageService>) -> Self {
        Self { storage }
    }

    /// Store a blob and return its key.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for oversized payloads and `Storage` if the write fails.
    pub async fn store_blob(
        &self,
        bytes: Bytes,
        content_type: &str,
        file_name: Option<&str>,
    ) -> Result<String, UploadError> {
        self.storage
            .validate_size(bytes.len() as u64)
            .map_err(|e| UploadError::validation(e.to_string()))?;

        let blob_key = format!("{BLOB_PREFIX}{}", Uuid::new_v4());
        let mut options = ObjectWrite::with_content_type(content_type);
        if let Some(name) = file_name.map(base_name).filter(|n| !n.is_empty()) {
            options = options.meta(META_ORIGINAL_NAME, name);
        }

        let size = bytes.len();
        self.storage.write(&blob_key, bytes, options).await?;
        info!(blob_key = %blob_key, size, "Blob stored");
        Ok(blob_key)
    }
}
