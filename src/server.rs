// 🌐 HTTP boundary - upload, cross-check, download once
//
// POST /get-headers           candidate comparison keys for two uploads
// POST /cross-check           reconcile, store both partitions, return counts + preview
// GET  /download-csv/:file    serve a stored partition once, then forget it

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::config::{is_allowed_upload, ServerConfig, ALLOWED_EXTENSIONS};
use crate::error::CrossCheckError;
use crate::export;
use crate::headers::{candidate_keys, HeaderCandidates};
use crate::ingest::ingest;
use crate::reconciliation::{PartitionResult, ReconciliationEngine, ReconciliationStatus};
use crate::table::{ComparisonKey, Record};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: ArtifactStore,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: ArtifactStore::new(config.retention),
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Responses & errors
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
struct HeadersResponse {
    headers: Vec<String>,
    selectable: bool,
    line_mode: bool,
}

impl From<HeaderCandidates> for HeadersResponse {
    fn from(candidates: HeaderCandidates) -> Self {
        Self {
            headers: candidates.labels(),
            selectable: candidates.is_selectable(),
            line_mode: candidates == HeaderCandidates::LineContent,
        }
    }
}

#[derive(Serialize)]
struct CrossCheckResponse {
    message: String,
    status: ReconciliationStatus,
    effective_key: Option<ComparisonKey>,
    total_a_rows: usize,
    matched_count: usize,
    missing_count: usize,
    missing_preview: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched_download: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_download: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please upload both File A and File B")]
    MissingFiles,

    #[error("Unsupported file type '{0}'; allowed extensions: {ext}", ext = allowed_list())]
    UnsupportedFile(String),

    #[error("File '{0}' exceeds the upload size limit")]
    FileTooLarge(String),

    #[error("Invalid upload: {message}")]
    Multipart { status: StatusCode, message: String },

    #[error(transparent)]
    CrossCheck(#[from] CrossCheckError),

    #[error(transparent)]
    NotFound(#[from] ArtifactError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

fn allowed_list() -> String {
    ALLOWED_EXTENSIONS
        .iter()
        .map(|e| format!(".{}", e))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFiles | ApiError::UnsupportedFile(_) | ApiError::CrossCheck(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Multipart { status, .. } => *status,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(ApiResponse::<()>::err(self.to_string()))).into_response()
    }
}

// ============================================================================
// Multipart form
// ============================================================================

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    file_a: Option<Upload>,
    file_b: Option<Upload>,
    compare_column: Option<String>,
}

impl UploadForm {
    fn into_files(self) -> Result<(Upload, Upload, Option<String>), ApiError> {
        match (self.file_a, self.file_b) {
            (Some(a), Some(b)) => Ok((a, b, self.compare_column)),
            _ => Err(ApiError::MissingFiles),
        }
    }
}

async fn read_form(mut multipart: Multipart, max_bytes: usize) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "fileA" | "file1" | "fileB" | "file2" => {
                let filename = field.file_name().map(ToString::to_string).unwrap_or_default();
                let bytes = field.bytes().await?;

                // Browsers send an empty part when no file was picked
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                if bytes.len() > max_bytes {
                    return Err(ApiError::FileTooLarge(filename));
                }
                if !is_allowed_upload(&filename) {
                    return Err(ApiError::UnsupportedFile(filename));
                }

                let upload = Upload {
                    filename,
                    bytes: bytes.to_vec(),
                };
                if name == "fileA" || name == "file1" {
                    form.file_a = Some(upload);
                } else {
                    form.file_b = Some(upload);
                }
            }
            "compareColumn" => {
                let text = field.text().await?;
                form.compare_column = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(form)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /get-headers - Candidate comparison keys, no reconciliation
async fn get_headers(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<HeadersResponse>>, ApiError> {
    let (file_a, file_b, _) = read_form(multipart, state.config.max_upload_bytes)
        .await?
        .into_files()?;

    let candidates = tokio::task::spawn_blocking(move || -> Result<_, CrossCheckError> {
        let table_a = ingest(&file_a.bytes, &file_a.filename)?;
        let table_b = ingest(&file_b.bytes, &file_b.filename)?;
        Ok(candidate_keys(&table_a, &table_b))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(ApiResponse::ok(candidates.into())))
}

/// POST /cross-check - Reconcile File A against File B
async fn cross_check(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<CrossCheckResponse>>, ApiError> {
    let (file_a, file_b, compare_column) = read_form(multipart, state.config.max_upload_bytes)
        .await?
        .into_files()?;

    tracing::info!(
        file_a = %file_a.filename,
        file_b = %file_b.filename,
        key = compare_column.as_deref().unwrap_or("<default>"),
        "cross-check requested"
    );

    let preview_limit = state.config.preview_limit;
    let (result, matched_csv, missing_csv) =
        tokio::task::spawn_blocking(move || run_cross_check(file_a, file_b, compare_column))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

    let (matched_download, missing_download) = match result.status {
        ReconciliationStatus::Completed => (
            Some(download_url(&state.store.put("matched", matched_csv))),
            Some(download_url(&state.store.put("missing", missing_csv))),
        ),
        _ => (None, None),
    };

    tracing::info!(summary = %result.summary(), "cross-check finished");

    Ok(Json(ApiResponse::ok(CrossCheckResponse {
        message: result.message().to_string(),
        status: result.status,
        missing_preview: result.missing_preview(preview_limit).to_vec(),
        effective_key: result.effective_key,
        total_a_rows: result.total_a_rows,
        matched_count: result.matched_count,
        missing_count: result.missing_count,
        matched_download,
        missing_download,
    })))
}

fn run_cross_check(
    file_a: Upload,
    file_b: Upload,
    compare_column: Option<String>,
) -> Result<(PartitionResult, Vec<u8>, Vec<u8>), ApiError> {
    let table_a = ingest(&file_a.bytes, &file_a.filename)?;
    let table_b = ingest(&file_b.bytes, &file_b.filename)?;

    let result = ReconciliationEngine::new().reconcile(&table_a, &table_b, compare_column.as_deref())?;
    let (matched, missing) =
        export::serialize_result(&result).map_err(|e| ApiError::Internal(format!("{:#}", e)))?;

    Ok((result, matched, missing))
}

fn download_url(handle: &str) -> String {
    format!("/download-csv/{}", handle)
}

/// GET /download-csv/:filename - Stream a stored partition once
async fn download_csv(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    // Decode URL-encoded filename
    let decoded_filename = urlencoding::decode(&filename)
        .unwrap_or_else(|_| filename.clone().into())
        .into_owned();

    let bytes = state.store.take(&decoded_filename)?;
    tracing::info!(file = %decoded_filename, bytes = bytes.len(), "download served");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", decoded_filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router & background sweep
// ============================================================================

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.body_limit();
    let web_dir = state.config.web_dir.clone();

    Router::new()
        .route("/", get(serve_index))
        .route("/api/health", get(health_check))
        .route("/get-headers", post(get_headers))
        .route("/cross-check", post(cross_check))
        .route("/download-csv/:filename", get(download_csv))
        .nest_service("/static", ServeDir::new(web_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Periodically drop downloads that outlived the retention window
pub fn spawn_sweeper(store: ArtifactStore, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = store.purge_expired();
            if removed > 0 {
                tracing::info!(removed, "expired downloads removed");
            }
        }
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "crosscheckboundary";

    fn multipart_body(files: &[(&str, &str, &str)], fields: &[(&str, &str)]) -> Body {
        let mut body = Vec::new();
        for (name, filename, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn post_form(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = send(state, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn state() -> AppState {
        AppState::new(ServerConfig::default())
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let (status, json) = send_json(&state(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], "OK");
    }

    #[tokio::test]
    async fn test_get_headers_union() {
        let body = multipart_body(
            &[
                ("fileA", "a.csv", "id,name\n1,x\n"),
                ("fileB", "b.csv", "email,id\nq@x,1\n"),
            ],
            &[],
        );
        let (status, json) = send_json(&state(), post_form("/get-headers", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["headers"], serde_json::json!(["id", "name", "email"]));
        assert_eq!(json["data"]["selectable"], true);
        assert_eq!(json["data"]["line_mode"], false);
    }

    #[tokio::test]
    async fn test_get_headers_plain_text() {
        let body = multipart_body(
            &[("file1", "a.txt", "foo\n"), ("file2", "b.csv", "id\n1\n")],
            &[],
        );
        let (status, json) = send_json(&state(), post_form("/get-headers", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["headers"], serde_json::json!(["Line Content"]));
        assert_eq!(json["data"]["line_mode"], true);
    }

    #[tokio::test]
    async fn test_cross_check_and_download_once() {
        let state = state();
        let body = multipart_body(
            &[
                ("fileA", "a.csv", "id,name\n1,x\n2,y\n"),
                ("fileB", "b.csv", "id,name\n2,z\n"),
            ],
            &[("compareColumn", "id")],
        );
        let (status, json) = send_json(&state, post_form("/cross-check", body)).await;

        assert_eq!(status, StatusCode::OK);
        let data = &json["data"];
        assert_eq!(data["matched_count"], 1);
        assert_eq!(data["missing_count"], 1);
        assert_eq!(data["total_a_rows"], 2);
        assert_eq!(data["effective_key"], "id");
        assert_eq!(data["missing_preview"], serde_json::json!([{"id": "1", "name": "x"}]));

        let matched_url = data["matched_download"].as_str().unwrap().to_string();
        let request = Request::builder().uri(&matched_url).body(Body::empty()).unwrap();
        let (status, bytes) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(bytes).unwrap(), "id,name\n2,y\n");

        // Second download is gone
        let request = Request::builder().uri(&matched_url).body(Body::empty()).unwrap();
        let (status, _) = send(&state, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let missing_url = data["missing_download"].as_str().unwrap().to_string();
        let request = Request::builder().uri(&missing_url).body(Body::empty()).unwrap();
        let (status, bytes) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(bytes).unwrap(), "id,name\n1,x\n");
    }

    #[tokio::test]
    async fn test_cross_check_empty_a() {
        let state = state();
        let body = multipart_body(
            &[("fileA", "a.txt", "\n\n"), ("fileB", "b.txt", "bar\n")],
            &[],
        );
        let (status, json) = send_json(&state, post_form("/cross-check", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "empty_a");
        assert_eq!(json["data"]["message"], "File A is empty; nothing to cross-check");
        assert_eq!(json["data"]["matched_count"], 0);
        assert!(json["data"].get("matched_download").is_none());
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_cross_check_unknown_key() {
        let body = multipart_body(
            &[("fileA", "a.csv", "id\n1\n"), ("fileB", "b.csv", "id\n1\n")],
            &[("compareColumn", "zzz")],
        );
        let (status, json) = send_json(&state(), post_form("/cross-check", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("zzz"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let body = multipart_body(&[("fileA", "a.csv", "id\n1\n")], &[]);
        let (status, json) = send_json(&state(), post_form("/cross-check", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Please upload both File A and File B");
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let body = multipart_body(
            &[("fileA", "a.pdf", "%PDF"), ("fileB", "b.csv", "id\n1\n")],
            &[],
        );
        let (status, json) = send_json(&state(), post_form("/get-headers", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("a.pdf"));
    }

    #[tokio::test]
    async fn test_oversized_upload() {
        let state = AppState::new(ServerConfig {
            max_upload_bytes: 4,
            ..ServerConfig::default()
        });
        let body = multipart_body(
            &[("fileA", "a.txt", "0123456789"), ("fileB", "b.txt", "1\n")],
            &[],
        );
        let (status, _) = send_json(&state, post_form("/cross-check", body)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_download() {
        let request = Request::builder()
            .uri("/download-csv/missing_nothing.csv")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send_json(&state(), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }
}
