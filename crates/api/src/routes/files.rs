//! File upload and download routes.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Multipart, Query, State, multipart::MultipartRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::AppState;
use crate::cors;
use crate::response::{PrefixedJson, error_response, not_found};
use crate::routes::form::{UploadForm, invalid_form, missing_parameters, rejection};
use filedock_core::upload::{FileLookup, ReconcileInput, UploadError, UploadService};
use filedock_db::FileRecordRepository;
use filedock_shared::AppError;

/// Creates the file routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/gcs",
        get(download_file).post(upload_file).options(cors::options),
    )
}

fn upload_service(state: &AppState) -> UploadService<FileRecordRepository> {
    let repo = FileRecordRepository::new((*state.db).clone());
    UploadService::new(Arc::clone(&state.storage), Arc::new(repo))
}

// ============================================================================
// Download
// ============================================================================

/// Query parameters for downloads.
#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    /// Numeric record id.
    #[serde(rename = "fileId")]
    pub file_id: Option<String>,
    /// Reference token.
    pub key: Option<String>,
}

impl DownloadParams {
    fn lookup(&self) -> Option<FileLookup> {
        if let Some(id) = self.file_id.as_deref() {
            return id.trim().parse().ok().map(FileLookup::Id);
        }
        self.key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(|k| FileLookup::Reference(k.to_string()))
    }
}

/// GET `/gcs?fileId=<id>` or `/gcs?key=<reference>`
/// Stream a stored file.
async fn download_file(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Response {
    let Some(lookup) = params.lookup() else {
        return not_found();
    };

    match upload_service(&state).fetch(lookup).await {
        Ok(stored) => {
            info!(
                file_id = stored.record.id,
                storage_key = %stored.record.storage_key,
                "Serving file"
            );
            let content_type = HeaderValue::from_str(&stored.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

            Response::builder()
                .header(CONTENT_TYPE, content_type)
                .header(CONTENT_LENGTH, stored.content_length)
                .header(
                    CONTENT_DISPOSITION,
                    content_disposition(&stored.original_name),
                )
                .body(Body::from_stream(stored.body))
                .unwrap_or_else(|e| {
                    error!(error = %e, "Failed to build download response");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                })
        }
        Err(UploadError::NotFound(_) | UploadError::ObjectMissing { .. }) => not_found(),
        Err(e) => {
            error!(error = %e, "Failed to fetch file");
            error_response(&AppError::from(e))
        }
    }
}

/// `attachment; filename=<name>` with characters that cannot appear in a
/// header value replaced.
fn content_disposition(name: &str) -> HeaderValue {
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename={safe}"))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// ============================================================================
// Upload
// ============================================================================

/// POST `/gcs`
/// Store a file and create or update its metadata record.
///
/// Multipart fields: `file_input`, `folderName`, `userName`, `userId`.
async fn upload_file(
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

    let (Some(file), Some(folder), Some(owner_name), Some(owner_id)) = (
        form.file.as_ref(),
        form.text("folderName"),
        form.text("userName"),
        form.text("userId"),
    ) else {
        return missing_parameters();
    };
    let Some(file_name) = file.file_name.as_deref().filter(|n| !n.trim().is_empty()) else {
        return missing_parameters();
    };

    let input = ReconcileInput {
        folder: folder.to_string(),
        file_name: file_name.to_string(),
        owner_id: owner_id.to_string(),
        owner_name: owner_name.to_string(),
        content_type: file.content_type.clone(),
        bytes: file.bytes.clone(),
    };

    match upload_service(&state).reconcile(input).await {
        Ok(record) => (
            StatusCode::OK,
            PrefixedJson(json!({
                "status": "success",
                "key": record.reference(),
                "id": record.id,
            })),
        )
            .into_response(),
        Err(UploadError::Validation(reason)) => {
            warn!(reason = %reason, "Upload rejected");
            (
                StatusCode::BAD_REQUEST,
                PrefixedJson(json!({
                    "status": "error",
                    "reason": reason,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Upload failed");
            let err = AppError::from(e);
            (
                crate::response::status_of(&err),
                PrefixedJson(json!({
                    "status": "error",
                    "key": "",
                    "reason": err.public_message(),
                })),
            )
                .into_response()
        }
    }
}
