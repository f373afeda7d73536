//! Orphaned object sweeper for Filedock.
//!
//! Usage:
//!   sweeper [PREFIX]   - Sweep objects under PREFIX (default: whole bucket)
//!
//! Deletes every object without a file record and appends a deletion audit
//! row for it. Blob store objects, and objects younger than
//! `storage.orphan_grace_secs`, are never touched.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filedock_core::storage::{StorageConfig, StorageService};
use filedock_core::upload::UploadService;
use filedock_db::{DeletionAuditRepository, FileRecordRepository, connect_with};
use filedock_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedock=info,sweeper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prefix = std::env::args().nth(1).unwrap_or_else(|| "/".to_string());

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = connect_with(&config.database).await?;
    let storage = StorageService::from_config(StorageConfig::from_settings(&config.storage)?)?;
    info!(prefix = %prefix, bucket = storage.bucket(), "Starting orphan sweep");

    let service = UploadService::new(
        Arc::new(storage),
        Arc::new(FileRecordRepository::new(db.clone())),
    );
    let audit = DeletionAuditRepository::new(db);

    let report = service.sweep_orphans(&audit, &prefix).await?;
    info!(
        scanned = report.scanned,
        removed = report.removed,
        recent = report.recent,
        failed = report.failed,
        "Sweep complete"
    );

    if report.failed > 0 {
        anyhow::bail!("{} objects could not be swept", report.failed);
    }
    Ok(())
}
