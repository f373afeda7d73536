//! Router tests against a mock database and in-memory storage.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;

use crate::cors::ALLOWED_HEADERS;
use crate::response::{JSON_PREFIX, NOT_FOUND_TEXT};
use crate::{AppState, create_router};
use filedock_core::signing::SignedUrlIssuer;
use filedock_core::storage::{ObjectWrite, StorageConfig, StorageProvider, StorageService};
use filedock_core::upload::encode_reference;
use filedock_db::entities::file_records;
use filedock_shared::{CorsConfig, SigningConfig};

const ORIGIN: &str = "http://localhost:9000";
const BOUNDARY: &str = "filedock-test-boundary";

fn record(id: i64, storage_key: &str) -> file_records::Model {
    let now = Utc::now();
    file_records::Model {
        id,
        storage_key: storage_key.to_string(),
        storage_bucket: "memory".to_string(),
        owner_id: "u-1".to_string(),
        owner_name: "Kira".to_string(),
        original_file_name: "a.png".to_string(),
        content_type: "image/png".to_string(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn mock_db(results: Vec<Vec<file_records::Model>>) -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(results)
        .into_connection()
}

fn state_with(db: DatabaseConnection, signing: SigningConfig) -> (AppState, Arc<StorageService>) {
    let storage = Arc::new(
        StorageService::from_config(StorageConfig::new(StorageProvider::Memory)).unwrap(),
    );
    let state = AppState {
        db: Arc::new(db),
        storage: Arc::clone(&storage),
        signer: Arc::new(SignedUrlIssuer::new(signing)),
        cors: CorsConfig {
            allowed_origins: vec![ORIGIN.to_string()],
        },
    };
    (state, storage)
}

fn state(db: DatabaseConnection) -> (AppState, Arc<StorageService>) {
    state_with(db, SigningConfig::default())
}

async fn send(state: AppState, request: Request<Body>) -> Response {
    create_router(state).oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn prefixed_json(response: Response) -> Value {
    let bytes = body_bytes(response).await;
    let text = std::str::from_utf8(&bytes).unwrap();
    let json = text.strip_prefix(JSON_PREFIX).expect("missing JSON prefix");
    serde_json::from_str(json).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn multipart(uri: &str, fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file_input\"; \
                 filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

const UPLOAD_FIELDS: [(&str, &str); 3] = [
    ("folderName", "photos"),
    ("userName", "Kira"),
    ("userId", "u-1"),
];

#[tokio::test]
async fn test_health_is_plain_json() {
    let (state, _) = state(mock_db(vec![]));
    let response = send(state, get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn test_download_non_numeric_id_is_404() {
    let (state, _) = state(mock_db(vec![]));
    let response = send(state, get("/gcs?fileId=abc")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, NOT_FOUND_TEXT);
}

#[tokio::test]
async fn test_download_unknown_id_is_404() {
    let (state, _) = state(mock_db(vec![vec![]]));
    let response = send(state, get("/gcs?fileId=42")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, NOT_FOUND_TEXT);
}

#[tokio::test]
async fn test_download_missing_object_is_404() {
    let (state, _) = state(mock_db(vec![vec![record(1, "photos/gone.png")]]));
    let response = send(state, get("/gcs?fileId=1")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_streams_bytes() {
    let (state, storage) = state(mock_db(vec![vec![record(1, "photos/a.png")]]));
    storage
        .write(
            "photos/a.png",
            Bytes::from_static(b"pixels"),
            ObjectWrite::with_content_type("image/png"),
        )
        .await
        .unwrap();

    let response = send(state, get(&format!("/gcs?key={}", encode_reference(1)))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "6");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=a.png"
    );
    assert_eq!(body_bytes(response).await, "pixels");
}

#[rstest::rstest]
#[case(&[("userName", "Kira"), ("userId", "u-1")], true)]
#[case(&[("folderName", "photos"), ("userId", "u-1")], true)]
#[case(&[("folderName", "photos"), ("userName", "Kira"), ("userId", "")], true)]
#[case(&UPLOAD_FIELDS, false)]
#[tokio::test]
async fn test_upload_missing_parameters(
    #[case] fields: &[(&str, &str)],
    #[case] with_file: bool,
) {
    let (state, _) = state(mock_db(vec![]));
    let file = with_file.then_some(("a.png", b"pixels".as_slice()));
    let response = send(state, multipart("/gcs", fields, file)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json; charset=UTF-8"
    );
    let json = prefixed_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["reason"], "Not all required parameters found");
}

#[rstest::rstest]
#[case("/gcs")]
#[case("/blobstore")]
#[tokio::test]
async fn test_non_multipart_upload_is_prefixed_400(#[case] uri: &str) {
    let (state, _) = state(mock_db(vec![]));
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = send(state, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = prefixed_json(response).await;
    assert_eq!(json["status"], "error");
    assert!(json["reason"].as_str().is_some_and(|r| !r.is_empty()));
}

#[tokio::test]
async fn test_upload_new_key() {
    let db = mock_db(vec![vec![], vec![record(7, "photos/a.png")]]);
    let (state, storage) = state(db);

    let response = send(
        state,
        multipart("/gcs", &UPLOAD_FIELDS, Some(("a.png", b"pixels".as_slice()))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = prefixed_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["id"], 7);
    assert_eq!(json["key"], encode_reference(7));
    assert_eq!(storage.read("photos/a.png").await.unwrap(), "pixels");
}

#[tokio::test]
async fn test_upload_duplicate_records_is_500() {
    let db = mock_db(vec![vec![record(1, "photos/a.png"), record(2, "photos/a.png")]]);
    let (state, storage) = state(db);

    let response = send(
        state,
        multipart("/gcs", &UPLOAD_FIELDS, Some(("a.png", b"pixels".as_slice()))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = prefixed_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["key"], "");
    assert!(!storage.exists("photos/a.png").await);
}

#[tokio::test]
async fn test_preflight_echoes_allowed_origin() {
    let (state, _) = state(mock_db(vec![]));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/gcs")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = send(state, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ORIGIN
    );
}

#[tokio::test]
async fn test_unlisted_origin_is_not_echoed() {
    let (state, _) = state(mock_db(vec![]));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/blobstore")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = send(state, request).await;

    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_plain_options_lists_headers_and_methods() {
    let (state, _) = state(mock_db(vec![]));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/gcs")
        .body(Body::empty())
        .unwrap();

    let response = send(state, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
        ALLOWED_HEADERS
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
        "POST, GET"
    );
}

#[tokio::test]
async fn test_blobstore_upload_url() {
    let (state, _) = state(mock_db(vec![]));
    let response = send(state, get("/blobstore")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(prefixed_json(response).await["uploadUrl"], "/blobstore");
}

#[tokio::test]
async fn test_blobstore_upload() {
    let (state, storage) = state(mock_db(vec![]));
    let response = send(
        state,
        multipart("/blobstore", &[], Some(("a.png", b"blob".as_slice()))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = prefixed_json(response).await;
    assert_eq!(json["status"], "success");
    let blob_key = json["blobKey"].as_str().unwrap();
    assert!(blob_key.starts_with("blobstore/"));
    assert_eq!(storage.read(blob_key).await.unwrap(), "blob");
}

#[tokio::test]
async fn test_sign_without_secret_is_500() {
    let (state, _) = state(mock_db(vec![]));
    let response = send(state, get("/sign_s3?file_name=a.png&file_type=image/png")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(prefixed_json(response).await["status"], "error");
}

#[tokio::test]
async fn test_sign_returns_urls() {
    let signing = SigningConfig {
        access_key_id: Some("AKIDEXAMPLE".to_string()),
        secret_key: Some("test-secret".to_string()),
        ..SigningConfig::default()
    };
    let (state, _) = state_with(mock_db(vec![]), signing);

    let response = send(state, get("/sign_s3?file_name=a.png&file_type=image/png")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = prefixed_json(response).await;
    assert_eq!(
        json["url"],
        "https://deepspace9.s3-us-west-2.amazonaws.com/a.png"
    );
    let signed = json["signed_request"].as_str().unwrap();
    assert!(signed.contains("AWSAccessKeyId=AKIDEXAMPLE"));
    assert!(signed.contains("&Signature="));
}
