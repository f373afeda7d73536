//! File records migration.
//!
//! Creates the metadata table with one row per stored object.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(FILE_RECORDS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS file_records CASCADE;")
            .await?;
        Ok(())
    }
}

const FILE_RECORDS_SQL: &str = r"
CREATE TABLE file_records (
    id BIGSERIAL PRIMARY KEY,
    storage_key TEXT NOT NULL,
    storage_bucket TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    owner_name TEXT NOT NULL,
    original_file_name TEXT NOT NULL,
    content_type TEXT NOT NULL DEFAULT 'application/octet-stream',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_file_records_storage_key UNIQUE (storage_key),
    CONSTRAINT chk_storage_key_not_blank CHECK (length(trim(storage_key)) > 0)
);

-- Uploads per owner
CREATE INDEX idx_file_records_owner ON file_records(owner_id, created_at DESC);
";
