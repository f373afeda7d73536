//! Deletion audit migration.
//!
//! Append-only log of objects removed from storage. Rows cannot be updated
//! or deleted once written.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(FILE_DELETIONS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
            DROP TABLE IF EXISTS file_deletions CASCADE;
            DROP FUNCTION IF EXISTS prevent_deletion_audit_change();
            ",
        )
        .await?;
        Ok(())
    }
}

const FILE_DELETIONS_SQL: &str = r"
CREATE TABLE file_deletions (
    id BIGSERIAL PRIMARY KEY,
    storage_key TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    original_name TEXT NOT NULL,
    deleted_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_file_deletions_key ON file_deletions(storage_key, deleted_at);

-- ============================================================
-- FUNCTION: prevent_deletion_audit_change
-- Keeps the audit log write-once
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_deletion_audit_change()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'file_deletions is append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_file_deletions_append_only
BEFORE UPDATE OR DELETE ON file_deletions
FOR EACH ROW
EXECUTE FUNCTION prevent_deletion_audit_change();
";
