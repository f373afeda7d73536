//! Response helpers.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use filedock_shared::AppError;

/// Prefix written before every JSON body to defeat JSON hijacking.
pub const JSON_PREFIX: &str = ")]}',\n";

/// Content type of prefixed JSON responses.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Body of the 404 served for unknown downloads.
pub const NOT_FOUND_TEXT: &str = "404: This file does not exist";

/// JSON response with the anti-hijacking prefix.
#[derive(Debug, Clone)]
pub struct PrefixedJson<T>(pub T);

impl<T: Serialize> IntoResponse for PrefixedJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_string(&self.0) {
            Ok(body) => (
                [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                format!("{JSON_PREFIX}{body}"),
            )
                .into_response(),
            Err(e) => {
                error!(error = %e, "Failed to serialize response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// `{status: "error", reason}` with the error's status code.
pub fn error_response(err: &AppError) -> Response {
    let status = status_of(err);
    (
        status,
        PrefixedJson(json!({
            "status": "error",
            "reason": err.public_message(),
        })),
    )
        .into_response()
}

/// Plain-text 404 used by the download route.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_TEXT).into_response()
}

/// HTTP status for an application error.
pub fn status_of(err: &AppError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_prefixed_json_body_and_header() {
        let response = PrefixedJson(json!({"status": "success"})).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json; charset=UTF-8"
        );
        assert_eq!(body_text(response).await, ")]}',\n{\"status\":\"success\"}");
    }

    #[tokio::test]
    async fn test_error_response_hides_backend_detail() {
        let response = error_response(&AppError::Database("password auth failed".into()));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.starts_with(JSON_PREFIX));
        assert!(!body.contains("password"));
    }

    #[test]
    fn test_status_of_validation() {
        assert_eq!(
            status_of(&AppError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
    }
}
