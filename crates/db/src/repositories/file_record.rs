//! File record repository for database operations.
//!
//! Implements the core `FileRecordRepository` trait using SeaORM.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::file_records;
use filedock_core::upload::{
    FileRecord, FileRecordRepository as FileRecordRepoTrait, NewFileRecord, UploadError,
};

/// File record repository implementation.
#[derive(Debug, Clone)]
pub struct FileRecordRepository {
    db: DatabaseConnection,
}

impl FileRecordRepository {
    /// Create a new file record repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl FileRecordRepoTrait for FileRecordRepository {
    async fn put(&self, input: NewFileRecord) -> Result<FileRecord, UploadError> {
        let now = Utc::now();
        let active_model = file_records::ActiveModel {
            storage_key: Set(input.storage_key),
            storage_bucket: Set(input.storage_bucket),
            owner_id: Set(input.owner_id),
            owner_name: Set(input.owner_name),
            original_file_name: Set(input.original_file_name),
            content_type: Set(input.content_type),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        // A concurrent upload may have inserted the key since the caller looked.
        let model = file_records::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(file_records::Column::StorageKey)
                    .update_columns([
                        file_records::Column::StorageBucket,
                        file_records::Column::OwnerId,
                        file_records::Column::OwnerName,
                        file_records::Column::OriginalFileName,
                        file_records::Column::ContentType,
                        file_records::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>, UploadError> {
        let model = file_records::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(model.map(to_domain))
    }

    async fn find_by_storage_key(&self, storage_key: &str) -> Result<Vec<FileRecord>, UploadError> {
        let models = file_records::Entity::find()
            .filter(file_records::Column::StorageKey.eq(storage_key))
            .order_by_asc(file_records::Column::Id)
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn update(&self, record: FileRecord) -> Result<FileRecord, UploadError> {
        let id = record.id;
        let active_model = file_records::ActiveModel {
            id: Unchanged(id),
            owner_id: Set(record.owner_id),
            owner_name: Set(record.owner_name),
            original_file_name: Set(record.original_file_name),
            content_type: Set(record.content_type),
            updated_at: Set(record.updated_at.into()),
            ..Default::default()
        };

        let model = active_model.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => UploadError::not_found(format!("file record {id}")),
            other => repository_error(other),
        })?;

        Ok(to_domain(model))
    }
}

fn repository_error(err: DbErr) -> UploadError {
    UploadError::repository(err.to_string())
}

/// Convert database model to domain record.
fn to_domain(model: file_records::Model) -> FileRecord {
    FileRecord {
        id: model.id,
        storage_key: model.storage_key,
        storage_bucket: model.storage_bucket,
        owner_id: model.owner_id,
        owner_name: model.owner_name,
        original_file_name: model.original_file_name,
        content_type: model.content_type,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
