//! API route definitions.

use axum::Router;
use axum::extract::DefaultBodyLimit;

use crate::{AppState, cors::build_cors};

pub mod blobstore;
pub mod files;
pub mod form;
pub mod health;
pub mod signing;

/// Room for multipart framing and the text fields around the file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Creates the API router with all routes.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let body_limit = state
        .storage
        .config()
        .max_file_size
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    // Browser-facing upload routes
    let upload_routes = Router::new()
        .merge(files::routes())
        .merge(blobstore::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(build_cors(&state.cors.allowed_origins));

    Router::new()
        .merge(health::routes())
        .merge(signing::routes())
        .merge(upload_routes)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
