//! Anonymous blob store routes.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::error;

use crate::AppState;
use crate::cors;
use crate::response::{PrefixedJson, error_response};
use crate::routes::form::{UploadForm, invalid_form, missing_parameters, rejection};
use filedock_core::upload::BlobStoreService;
use filedock_shared::AppError;

/// Path uploads are posted to.
const BLOBSTORE_PATH: &str = "/blobstore";

/// Creates the blob store routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        BLOBSTORE_PATH,
        get(upload_url).post(upload_blob).options(cors::options),
    )
}

/// GET `/blobstore`
/// Tell the client where to post the blob.
async fn upload_url() -> Response {
    PrefixedJson(json!({ "uploadUrl": BLOBSTORE_PATH })).into_response()
}

/// POST `/blobstore`
/// Store an anonymous blob and return its key.
async fn upload_blob(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => return invalid_form(&e),
    };
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return rejection(&e),
    };
    let Some(file) = form.file else {
        return missing_parameters();
    };

    let service = BlobStoreService::new(Arc::clone(&state.storage));
    match service
        .store_blob(file.bytes, &file.content_type, file.file_name.as_deref())
        .await
    {
        Ok(blob_key) => (
            StatusCode::OK,
            PrefixedJson(json!({
                "status": "success",
                "blobKey": blob_key,
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Blob upload failed");
            error_response(&AppError::from(e))
        }
    }
}
