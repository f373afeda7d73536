//! CORS for the browser-facing upload routes.

use axum::http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Headers a browser may send on an upload.
pub const ALLOWED_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";

/// Methods the upload routes accept cross-origin.
pub const ALLOWED_METHODS: &str = "POST, GET";

/// Build the CORS layer. `Access-Control-Allow-Origin` is echoed only for
/// listed origins.
pub fn build_cors(origins: &[String]) -> CorsLayer {
    let list = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods([Method::POST, Method::GET])
        .allow_headers([ORIGIN, X_REQUESTED_WITH, CONTENT_TYPE, ACCEPT])
}

/// `OPTIONS` handler for requests that are not CORS preflights.
pub async fn options() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            ("access-control-allow-headers", ALLOWED_HEADERS),
            ("access-control-allow-methods", ALLOWED_METHODS),
        ],
    )
}
