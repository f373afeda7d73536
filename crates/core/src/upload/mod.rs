//! Upload reconciliation.
//!
//! This module decides whether an upload creates or updates a metadata
//! record, writes the bytes to object storage, and resolves stored files
//! for download. It also hosts the anonymous blob store and the orphan sweep.

mod blob;
mod error;
mod service;
mod types;

pub use blob::{BLOB_PREFIX, BlobStoreService};
pub use error::UploadError;
pub use service::{DeletionAuditRepository, FileRecordRepository, UploadService};
pub use types::{
    DeletionAudit, FileLookup, FileRecord, META_ORIGINAL_NAME, META_USER_ID, META_USER_NAME,
    NewDeletionAudit, NewFileRecord, ReconcileInput, StoredObject, SweepReport, decode_reference,
    encode_reference,
};
