//! Multipart form parsing shared by the upload routes.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::json;
use tracing::warn;

use crate::response::PrefixedJson;

/// Name of the form field carrying the file.
pub const FILE_FIELD: &str = "file_input";

/// Content type used when the client sends none.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Uploaded file part.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// File name from the part's `Content-Disposition`.
    pub file_name: Option<String>,
    /// Content type of the part.
    pub content_type: String,
    /// File content.
    pub bytes: Bytes,
}

/// A parsed upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// The file part, if present.
    pub file: Option<FilePart>,
    /// Text fields by name.
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read every part of the form.
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == FILE_FIELD {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await?;
                form.file = Some(FilePart {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// A text field, if present and not blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Response for a request whose body is not a multipart form at all.
pub fn invalid_form(err: &MultipartRejection) -> Response {
    warn!(error = %err, "Rejected non-multipart body");
    error_json(err.status(), err.body_text())
}

/// Response for a multipart body that failed mid-parse.
pub fn rejection(err: &MultipartError) -> Response {
    warn!(error = %err, "Rejected multipart body");
    error_json(err.status(), err.body_text())
}

fn error_json(status: StatusCode, reason: String) -> Response {
    (
        status,
        PrefixedJson(json!({
            "status": "error",
            "reason": reason,
        })),
    )
        .into_response()
}

/// 400 response for a form missing required fields.
pub fn missing_parameters() -> Response {
    error_json(
        StatusCode::BAD_REQUEST,
        "Not all required parameters found".to_string(),
    )
}
