//! Filedock API Server
//!
//! Main entry point for the Filedock upload backend.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filedock_api::{AppState, create_router};
use filedock_core::signing::SignedUrlIssuer;
use filedock_core::storage::{StorageConfig, StorageService};
use filedock_db::connect_with;
use filedock_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedock=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    // Create storage service
    let storage_config = StorageConfig::from_settings(&config.storage)?;
    let storage = StorageService::from_config(storage_config)?;
    info!(
        provider = storage.provider_name(),
        bucket = storage.bucket(),
        max_file_size = storage.config().max_file_size,
        "Storage configured"
    );

    // Create URL signer
    if config.signing.secret_key.is_none() {
        warn!("Signing secret key not set; /sign_s3 will return errors");
    }
    let signer = SignedUrlIssuer::new(config.signing.clone());

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        storage: Arc::new(storage),
        signer: Arc::new(signer),
        cors: config.cors.clone(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
