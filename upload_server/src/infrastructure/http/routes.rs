//! HTTP wire surface (§6): the reference `RequestAdapter` mapping, plus
//! `/files/{fileId}` ranged reads, `/health`, and `/metrics`.
//!
//! Route shapes follow axum chunk-receiving server conventions; error
//! responses map from `UploadError::category()` to a status code below.

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use upload_domain::services::blob_store::ByteRange;
use upload_domain::services::request_adapter::{CreateFileResponse, MergeFileResponse, UploadChunkResponse, VerifyHashResponse};
use upload_domain::UploadError;

use super::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload/create", post(create_file))
        .route("/upload/verify", post(verify_hash))
        .route("/upload/chunk", post(upload_chunk))
        .route("/upload/merge", post(merge_file))
        .route("/files/{file_id}", get(get_file))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for UploadErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            "argument" | "transition" | "mismatch" => StatusCode::BAD_REQUEST,
            "token" => StatusCode::UNAUTHORIZED,
            "not_found" => StatusCode::NOT_FOUND,
            "integrity" => StatusCode::UNPROCESSABLE_ENTITY,
            "storage" | "internal" | "plugin" => StatusCode::INTERNAL_SERVER_ERROR,
            "network" | "timeout" => StatusCode::BAD_GATEWAY,
            "cancelled" => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

struct UploadErrorResponse(UploadError);

impl From<UploadError> for UploadErrorResponse {
    fn from(e: UploadError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFileRequest {
    file_name: String,
    file_size: u64,
    file_type: String,
    preferred_chunk_size: Option<u64>,
}

async fn create_file(State(state): State<AppState>, Json(req): Json<CreateFileRequest>) -> Result<Json<CreateFileResponse>, UploadErrorResponse> {
    let resp = state
        .service
        .create_file(&req.file_name, req.file_size, &req.file_type, req.preferred_chunk_size)
        .await?;
    Ok(Json(resp))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyHashRequest {
    upload_token: String,
    file_hash: Option<String>,
    chunk_hashes: Option<Vec<String>>,
}

async fn verify_hash(State(state): State<AppState>, Json(req): Json<VerifyHashRequest>) -> Result<Json<VerifyHashResponse>, UploadErrorResponse> {
    let resp = state
        .service
        .verify_hash(&req.upload_token, req.file_hash.as_deref(), req.chunk_hashes.as_deref())
        .await?;
    Ok(Json(resp))
}

/// `multipart: uploadToken, chunkIndex, chunkHash, chunk` (§6).
async fn upload_chunk(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadChunkResponse>, UploadErrorResponse> {
    let mut upload_token = None;
    let mut chunk_index: Option<u32> = None;
    let mut chunk_hash = None;
    let mut chunk_bytes = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| UploadError::invalid_argument(e.to_string()))? {
        match field.name().unwrap_or_default() {
            "uploadToken" => upload_token = Some(field.text().await.map_err(|e| UploadError::invalid_argument(e.to_string()))?),
            "chunkIndex" => {
                let text = field.text().await.map_err(|e| UploadError::invalid_argument(e.to_string()))?;
                chunk_index = Some(text.parse().map_err(|_| UploadError::invalid_argument("chunkIndex must be an integer"))?);
            }
            "chunkHash" => chunk_hash = Some(field.text().await.map_err(|e| UploadError::invalid_argument(e.to_string()))?),
            "chunk" => chunk_bytes = Some(field.bytes().await.map_err(|e| UploadError::invalid_argument(e.to_string()))?),
            _ => {}
        }
    }

    let upload_token = upload_token.ok_or_else(|| UploadError::invalid_argument("missing uploadToken field"))?;
    let chunk_index = chunk_index.ok_or_else(|| UploadError::invalid_argument("missing chunkIndex field"))?;
    let chunk_hash = chunk_hash.ok_or_else(|| UploadError::invalid_argument("missing chunkHash field"))?;
    let chunk_bytes = chunk_bytes.ok_or_else(|| UploadError::invalid_argument("missing chunk field"))?;

    let resp = state.service.upload_chunk(&upload_token, chunk_index, &chunk_hash, chunk_bytes).await?;
    Ok(Json(resp))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeFileRequest {
    upload_token: String,
    file_hash: String,
    chunk_hashes: Vec<String>,
}

async fn merge_file(State(state): State<AppState>, Json(req): Json<MergeFileRequest>) -> Result<Json<MergeFileResponse>, UploadErrorResponse> {
    let resp = state.service.merge_file(&req.upload_token, &req.file_hash, &req.chunk_hashes).await?;
    Ok(Json(resp))
}

async fn get_file(State(state): State<AppState>, Path(file_id): Path<String>, headers: HeaderMap) -> Result<Response, UploadErrorResponse> {
    let range = parse_range_header(&headers, &state, &file_id).await?;
    let file_stream = state.service.get_file_stream(&file_id, range).await?;

    let body_stream = file_stream.stream;
    let body = Body::from_stream(body_stream);

    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, file_stream.mime_type)
        .header(header::ACCEPT_RANGES, "bytes");

    if let Some(r) = range {
        response = response
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_LENGTH, r.len().to_string())
            .header(header::CONTENT_RANGE, format!("bytes {}-{}/{}", r.start, r.end_inclusive, file_stream.total_size));
    } else {
        response = response
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, file_stream.total_size.to_string());
    }

    Ok(response.body(body).expect("response builder invariants are upheld above"))
}

async fn parse_range_header(headers: &HeaderMap, state: &AppState, file_id: &str) -> Result<Option<ByteRange>, UploadErrorResponse> {
    let Some(value) = headers.get(header::RANGE) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| UploadError::invalid_argument("invalid Range header encoding"))?;
    let Some(spec) = value.strip_prefix("bytes=") else {
        return Ok(None);
    };
    let (start_str, end_str) = spec.split_once('-').ok_or_else(|| UploadError::invalid_argument("malformed Range header"))?;
    let start: u64 = start_str.parse().map_err(|_| UploadError::invalid_argument("malformed Range start"))?;

    let end_inclusive = if end_str.is_empty() {
        let manifest = state
            .service
            .get_file_stream(file_id, None)
            .await
            .map(|s| s.total_size)
            .unwrap_or(0);
        manifest.saturating_sub(1)
    } else {
        end_str.parse().map_err(|_| UploadError::invalid_argument("malformed Range end"))?
    };

    Ok(Some(ByteRange { start, end_inclusive }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    uptime: u64,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.draining.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse { status: "draining", timestamp: now_ms(), uptime: state.started_at.elapsed().as_secs() }));
    }
    (StatusCode::OK, Json(HealthResponse { status: "ok", timestamp: now_ms(), uptime: state.started_at.elapsed().as_secs() }))
}

async fn metrics() -> impl IntoResponse {
    use prometheus::{Encoder, TextEncoder};

    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    (StatusCode::OK, String::from_utf8_lossy(&buffer).into_owned())
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
