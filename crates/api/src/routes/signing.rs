//! Pre-signed upload URL route.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use crate::response::PrefixedJson;

/// Creates the signing routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sign_s3", get(sign_upload))
}

/// Query parameters for `/sign_s3`.
#[derive(Debug, Deserialize)]
pub struct SignParams {
    /// Object name to upload under.
    #[serde(default)]
    pub file_name: String,
    /// MIME type the upload will carry.
    #[serde(default)]
    pub file_type: String,
}

/// GET `/sign_s3?file_name=&file_type=`
/// Issue a pre-signed upload URL.
async fn sign_upload(
    State(state): State<AppState>,
    Query(params): Query<SignParams>,
) -> impl IntoResponse {
    let expiry = state.signer.default_expiry_secs();

    match state
        .signer
        .issue_upload_url(&params.file_name, &params.file_type, expiry)
    {
        Ok(signed) => {
            info!(file_name = %params.file_name, "Upload URL signed");
            PrefixedJson(signed).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to sign upload URL");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                PrefixedJson(json!({
                    "status": "error",
                    "reason": "Upload signing is not configured"
                })),
            )
                .into_response()
        }
    }
}
