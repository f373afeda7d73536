//! Upload types and data structures.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ObjectStream;

/// Kind prefix encoded into reference tokens.
const REFERENCE_KIND: &str = "file_records";

/// Object metadata key holding the uploader id.
pub const META_USER_ID: &str = "user-id";
/// Object metadata key holding the uploader display name.
pub const META_USER_NAME: &str = "user-name";
/// Object metadata key holding the client-side file name.
pub const META_ORIGINAL_NAME: &str = "original-name";

/// Metadata record for one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Store-assigned id.
    pub id: i64,
    /// Key of the object in storage. Unique across records.
    pub storage_key: String,
    /// Bucket or container the object lives in.
    pub storage_bucket: String,
    /// Uploader id.
    pub owner_id: String,
    /// Uploader display name.
    pub owner_name: String,
    /// File name as supplied by the client.
    pub original_file_name: String,
    /// MIME type of the last upload.
    pub content_type: String,
    /// Set once on creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every upload to the same key.
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Opaque, URL-safe token that identifies this record.
    #[must_use]
    pub fn reference(&self) -> String {
        encode_reference(self.id)
    }
}

/// Input for inserting a record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Key of the object in storage.
    pub storage_key: String,
    /// Bucket or container.
    pub storage_bucket: String,
    /// Uploader id.
    pub owner_id: String,
    /// Uploader display name.
    pub owner_name: String,
    /// Client-side file name.
    pub original_file_name: String,
    /// MIME type.
    pub content_type: String,
}

/// Everything needed to store one upload.
#[derive(Debug, Clone)]
pub struct ReconcileInput {
    /// Folder the file goes into.
    pub folder: String,
    /// Client-side file name.
    pub file_name: String,
    /// Uploader id.
    pub owner_id: String,
    /// Uploader display name.
    pub owner_name: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// Payload.
    pub bytes: Bytes,
}

/// How to find a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLookup {
    /// By record id.
    Id(i64),
    /// By reference token.
    Reference(String),
    /// By storage key.
    StorageKey(String),
}

/// A record together with its object content.
pub struct StoredObject {
    /// The metadata record.
    pub record: FileRecord,
    /// Content type to serve.
    pub content_type: String,
    /// Object size in bytes.
    pub content_length: u64,
    /// File name to offer the client.
    pub original_name: String,
    /// Object content.
    pub body: ObjectStream,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("record", &self.record)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("original_name", &self.original_name)
            .finish_non_exhaustive()
    }
}

/// Append-only record of a deleted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionAudit {
    /// Store-assigned id.
    pub id: i64,
    /// Key of the deleted object.
    pub storage_key: String,
    /// Owner of the deleted object.
    pub owner_id: String,
    /// Client-side file name of the deleted object.
    pub original_name: String,
    /// When the deletion happened.
    pub deleted_at: DateTime<Utc>,
}

/// Input for appending a deletion audit.
#[derive(Debug, Clone)]
pub struct NewDeletionAudit {
    /// Key of the deleted object.
    pub storage_key: String,
    /// Owner of the deleted object.
    pub owner_id: String,
    /// Client-side file name of the deleted object.
    pub original_name: String,
}

impl NewDeletionAudit {
    /// Build an audit entry from object metadata, with fallbacks when absent.
    #[must_use]
    pub fn from_object_metadata(storage_key: &str, metadata: &HashMap<String, String>) -> Self {
        let owner_id = metadata
            .get(META_USER_ID)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let original_name = metadata.get(META_ORIGINAL_NAME).cloned().unwrap_or_else(|| {
            storage_key
                .rsplit('/')
                .next()
                .unwrap_or(storage_key)
                .to_string()
        });

        Self {
            storage_key: storage_key.to_string(),
            owner_id,
            original_name,
        }
    }
}

/// Outcome of an orphan sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Objects examined.
    pub scanned: usize,
    /// Orphans deleted.
    pub removed: usize,
    /// Unreferenced objects left alone because they are inside the grace window.
    pub recent: usize,
    /// Objects that could not be processed.
    pub failed: usize,
}

/// Encode a record id as a reference token.
#[must_use]
pub fn encode_reference(id: i64) -> String {
    URL_SAFE_NO_PAD.encode(format!("{REFERENCE_KIND}:{id}"))
}

/// Decode a reference token back into a record id.
///
/// Returns `None` for anything that was not produced by [`encode_reference`].
#[must_use]
pub fn decode_reference(token: &str) -> Option<i64> {
    let raw = URL_SAFE_NO_PAD.decode(token.trim()).ok()?;
    let text = String::from_utf8(raw).ok()?;
    let (kind, id) = text.split_once(':')?;
    if kind != REFERENCE_KIND {
        return None;
    }
    id.parse().ok()
}
