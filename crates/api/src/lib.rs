//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Upload, download and blob store routes
//! - Signed upload URL route
//! - CORS for browser uploads
//! - Prefixed JSON responses

pub mod cors;
pub mod response;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use filedock_core::signing::SignedUrlIssuer;
use filedock_core::storage::StorageService;
use filedock_shared::CorsConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Object storage for uploaded files.
    pub storage: Arc<StorageService>,
    /// Issuer for pre-signed upload URLs.
    pub signer: Arc<SignedUrlIssuer>,
    /// Origins allowed to call the upload routes.
    pub cors: CorsConfig,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
