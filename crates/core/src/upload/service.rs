//! Upload reconciliation service implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::blob::BLOB_PREFIX;
use super::error::UploadError;
use super::types::{
    DeletionAudit, FileLookup, FileRecord, META_ORIGINAL_NAME, META_USER_ID, META_USER_NAME,
    NewDeletionAudit, NewFileRecord, ReconcileInput, StoredObject, SweepReport, decode_reference,
};
use crate::storage::{ObjectWrite, StorageService, base_name};

/// Repository trait for file record persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait FileRecordRepository: Send + Sync {
    /// Insert a record, or update the one already holding the same storage key.
    ///
    /// `created_at` of an existing record is preserved.
    fn put(
        &self,
        input: NewFileRecord,
    ) -> impl std::future::Future<Output = Result<FileRecord, UploadError>> + Send;

    /// Find record by ID.
    fn find_by_id(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<FileRecord>, UploadError>> + Send;

    /// Find all records holding a storage key. Expected to be zero or one.
    fn find_by_storage_key(
        &self,
        storage_key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<FileRecord>, UploadError>> + Send;

    /// Persist the mutable fields of an existing record.
    fn update(
        &self,
        record: FileRecord,
    ) -> impl std::future::Future<Output = Result<FileRecord, UploadError>> + Send;
}

/// Repository trait for the append-only deletion log.
pub trait DeletionAuditRepository: Send + Sync {
    /// Append an entry.
    fn append(
        &self,
        input: NewDeletionAudit,
    ) -> impl std::future::Future<Output = Result<DeletionAudit, UploadError>> + Send;

    /// List entries for a storage key, oldest first.
    fn list_by_storage_key(
        &self,
        storage_key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<DeletionAudit>, UploadError>> + Send;
}

/// Upload service for storing files and their metadata records.
pub struct UploadService<R: FileRecordRepository> {
    storage: Arc<StorageService>,
    repo: Arc<R>,
}

impl<R: FileRecordRepository> UploadService<R> {
    /// Create a new upload service.
    #[must_use]
    pub fn new(storage: Arc<StorageService>, repo: Arc<R>) -> Self {
        Self { storage, repo }
    }

    /// Store an upload and create or update its metadata record.
    ///
    /// The object is written before the record is committed. If the commit
    /// fails the object stays behind until the orphan sweep reclaims it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A required field is blank or the payload is too large
    /// - More than one record already holds the storage key
    /// - Storage or repository operations fail
    pub async fn reconcile(&self, input: ReconcileInput) -> Result<FileRecord, UploadError> {
        validate_required(&input)?;
        self.storage
            .validate_size(input.bytes.len() as u64)
            .map_err(|e| UploadError::validation(e.to_string()))?;
        let storage_key = StorageService::storage_key(&input.folder, &input.file_name)
            .map_err(|e| UploadError::validation(e.to_string()))?;
        let file_name = base_name(&input.file_name).to_string();

        let mut existing = self.repo.find_by_storage_key(&storage_key).await?;
        if existing.len() > 1 {
            return Err(UploadError::UnexpectedCardinality {
                storage_key,
                count: existing.len(),
            });
        }

        let options = ObjectWrite::with_content_type(&input.content_type)
            .meta(META_USER_ID, &input.owner_id)
            .meta(META_USER_NAME, &input.owner_name)
            .meta(META_ORIGINAL_NAME, &file_name);
        let size = input.bytes.len();
        self.storage
            .write(&storage_key, input.bytes, options)
            .await?;

        let record = match existing.pop() {
            Some(mut record) => {
                record.owner_id = input.owner_id;
                record.owner_name = input.owner_name;
                record.original_file_name = file_name;
                record.content_type = input.content_type;
                record.updated_at = Utc::now();
                self.repo.update(record).await?
            }
            None => {
                self.repo
                    .put(NewFileRecord {
                        storage_key,
                        storage_bucket: self.storage.bucket().to_string(),
                        owner_id: input.owner_id,
                        owner_name: input.owner_name,
                        original_file_name: file_name,
                        content_type: input.content_type,
                    })
                    .await?
            }
        };

        info!(
            file_id = record.id,
            storage_key = %record.storage_key,
            size,
            "Upload reconciled"
        );
        Ok(record)
    }

    /// Resolve a lookup to a record and open its object.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record matches, `ObjectMissing` if the record
    /// exists but its object does not.
    pub async fn fetch(&self, lookup: FileLookup) -> Result<StoredObject, UploadError> {
        let record = self.get_record(&lookup).await?;

        let Some(stat) = self.storage.stat(&record.storage_key).await? else {
            warn!(
                file_id = record.id,
                storage_key = %record.storage_key,
                "Record points at a missing object"
            );
            return Err(UploadError::ObjectMissing {
                storage_key: record.storage_key,
            });
        };

        let body = self.storage.open(&record.storage_key).await?;
        let content_type = stat
            .content_type
            .clone()
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| record.content_type.clone());
        let original_name = stat
            .metadata
            .get(META_ORIGINAL_NAME)
            .cloned()
            .unwrap_or_else(|| record.original_file_name.clone());

        Ok(StoredObject {
            content_type,
            content_length: stat.content_length,
            original_name,
            body,
            record,
        })
    }

    /// Resolve a lookup to a record without touching storage.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record matches.
    pub async fn get_record(&self, lookup: &FileLookup) -> Result<FileRecord, UploadError> {
        let found = match lookup {
            FileLookup::Id(id) => self.repo.find_by_id(*id).await?,
            FileLookup::Reference(token) => match decode_reference(token) {
                Some(id) => self.repo.find_by_id(id).await?,
                None => None,
            },
            FileLookup::StorageKey(key) => {
                let mut records = self.repo.find_by_storage_key(key).await?;
                if records.len() > 1 {
                    return Err(UploadError::UnexpectedCardinality {
                        storage_key: key.clone(),
                        count: records.len(),
                    });
                }
                records.pop()
            }
        };

        found.ok_or_else(|| UploadError::not_found(format!("{lookup:?}")))
    }

    /// Delete objects under `prefix` that no record points at.
    ///
    /// Objects modified within the storage config's orphan grace window are
    /// skipped, since an upload writes its object before committing the
    /// record. Each deletion is logged to `audit`. A failure on one object is
    /// counted and the sweep moves on.
    ///
    /// # Errors
    ///
    /// Returns an error only if the listing itself fails.
    pub async fn sweep_orphans<A: DeletionAuditRepository>(
        &self,
        audit: &A,
        prefix: &str,
    ) -> Result<SweepReport, UploadError> {
        let keys = self.storage.list(prefix).await?;
        let mut report = SweepReport::default();

        for key in keys {
            if key.starts_with(BLOB_PREFIX) {
                continue;
            }
            report.scanned += 1;

            match self.sweep_one(audit, &key).await {
                Ok(SweepOutcome::Removed) => report.removed += 1,
                Ok(SweepOutcome::Recent) => report.recent += 1,
                Ok(SweepOutcome::Referenced) => {}
                Err(e) => {
                    warn!(storage_key = %key, error = %e, "Failed to sweep object");
                    report.failed += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            removed = report.removed,
            recent = report.recent,
            failed = report.failed,
            "Orphan sweep finished"
        );
        Ok(report)
    }

    async fn sweep_one<A: DeletionAuditRepository>(
        &self,
        audit: &A,
        key: &str,
    ) -> Result<SweepOutcome, UploadError> {
        if !self.repo.find_by_storage_key(key).await?.is_empty() {
            return Ok(SweepOutcome::Referenced);
        }

        let Some(stat) = self.storage.stat(key).await? else {
            return Ok(SweepOutcome::Referenced);
        };
        let grace = self.storage.config().orphan_grace;
        if within_grace(stat.last_modified, Utc::now(), grace) {
            debug!(storage_key = %key, "Unreferenced object inside grace window");
            return Ok(SweepOutcome::Recent);
        }

        // An upload may have committed its record while the object was stat'ed.
        if !self.repo.find_by_storage_key(key).await?.is_empty() {
            return Ok(SweepOutcome::Referenced);
        }

        self.storage.delete(key).await?;
        audit
            .append(NewDeletionAudit::from_object_metadata(key, &stat.metadata))
            .await?;
        debug!(storage_key = %key, "Orphaned object removed");
        Ok(SweepOutcome::Removed)
    }
}

enum SweepOutcome {
    Referenced,
    Recent,
    Removed,
}

/// Whether an object is too young to be treated as an orphan.
///
/// An unknown modification time counts as young unless the window is zero.
fn within_grace(
    last_modified: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    grace: Duration,
) -> bool {
    if grace.is_zero() {
        return false;
    }
    match last_modified {
        Some(modified) => (now - modified)
            .to_std()
            .map_or(true, |age| age < grace),
        None => true,
    }
}

fn validate_required(input: &ReconcileInput) -> Result<(), UploadError> {
    let fields = [
        ("folder", &input.folder),
        ("file_name", &input.file_name),
        ("owner_id", &input.owner_id),
        ("owner_name", &input.owner_name),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(UploadError::validation(format!("{name} is required")));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
