//! Deletion audit repository for database operations.
//!
//! The log is append-only: this repository never updates or deletes rows.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::file_deletions;
use filedock_core::upload::{
    DeletionAudit, DeletionAuditRepository as DeletionAuditRepoTrait, NewDeletionAudit,
    UploadError,
};

/// Deletion audit repository implementation.
#[derive(Debug, Clone)]
pub struct DeletionAuditRepository {
    db: DatabaseConnection,
}

impl DeletionAuditRepository {
    /// Create a new deletion audit repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl DeletionAuditRepoTrait for DeletionAuditRepository {
    async fn append(&self, input: NewDeletionAudit) -> Result<DeletionAudit, UploadError> {
        let active_model = file_deletions::ActiveModel {
            storage_key: Set(input.storage_key),
            owner_id: Set(input.owner_id),
            original_name: Set(input.original_name),
            deleted_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| UploadError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn list_by_storage_key(&self, storage_key: &str) -> Result<Vec<DeletionAudit>, UploadError> {
        let models = file_deletions::Entity::find()
            .filter(file_deletions::Column::StorageKey.eq(storage_key))
            .order_by_asc(file_deletions::Column::DeletedAt)
            .order_by_asc(file_deletions::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| UploadError::repository(e.to_string()))?;

        Ok(models.into_iter().map(to_domain).collect())
    }
}

fn to_domain(model: file_deletions::Model) -> DeletionAudit {
    DeletionAudit {
        id: model.id,
        storage_key: model.storage_key,
        owner_id: model.owner_id,
        original_name: model.original_name,
        deleted_at: model.deleted_at.with_timezone(&Utc),
    }
}
