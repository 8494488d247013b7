//! HTTP `RequestAdapter` (C6): the production transport, talking JSON +
//! raw chunk bodies to an `upload-server` instance over `reqwest`.
//!
//! Transport-level concerns — connection pooling, TLS, per-request
//! timeout — are `reqwest::Client`'s job; this adapter's own
//! responsibility stops at mapping HTTP status/body onto `UploadError`
//! categories so `UploadTask`'s retry loop can tell a transient network
//! failure from a permanent rejection.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use upload_domain::services::request_adapter::{CreateFileResponse, MergeFileResponse, UploadChunkResponse, VerifyHashResponse};
use upload_domain::{RequestAdapter, UploadError};

/// Default per-request timeout. Chunk uploads run their own retry policy
/// above this adapter (`UploadTask`'s `retry_count`/`retry_delay_ms`), so
/// this only bounds a single attempt.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ReqwestAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestAdapter {
    pub fn new(base_url: impl Into<String>) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| UploadError::InvalidConfiguration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn classify(err: reqwest::Error) -> UploadError {
        if err.is_timeout() {
            UploadError::TimeoutError(err.to_string())
        } else if err.is_connect() || err.is_request() {
            UploadError::NetworkError(err.to_string())
        } else {
            UploadError::NetworkError(err.to_string())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFileRequest<'a> {
    file_name: &'a str,
    file_size: u64,
    file_type: &'a str,
    preferred_chunk_size: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyHashRequest<'a> {
    upload_token: &'a str,
    file_hash: Option<&'a str>,
    chunk_hashes: Option<&'a [String]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeFileRequest<'a> {
    upload_token: &'a str,
    file_hash: &'a str,
    chunk_hashes: &'a [String],
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[async_trait]
impl RequestAdapter for ReqwestAdapter {
    async fn create_file(
        &self,
        file_name: &str,
        file_size: u64,
        file_type: &str,
        preferred_chunk_size: Option<u64>,
    ) -> Result<CreateFileResponse, UploadError> {
        let resp = self
            .client
            .post(self.url("/upload/create"))
            .json(&CreateFileRequest {
                file_name,
                file_size,
                file_type,
                preferred_chunk_size,
            })
            .send()
            .await
            .map_err(Self::classify)?;
        decode_json(resp).await
    }

    async fn verify_hash(
        &self,
        upload_token: &str,
        file_hash: Option<&str>,
        chunk_hashes: Option<&[String]>,
    ) -> Result<VerifyHashResponse, UploadError> {
        let resp = self
            .client
            .post(self.url("/upload/verify"))
            .json(&VerifyHashRequest {
                upload_token,
                file_hash,
                chunk_hashes,
            })
            .send()
            .await
            .map_err(Self::classify)?;
        decode_json(resp).await
    }

    async fn upload_chunk(
        &self,
        upload_token: &str,
        chunk_index: u32,
        chunk_hash: &str,
        chunk_bytes: Vec<u8>,
    ) -> Result<UploadChunkResponse, UploadError> {
        let form = reqwest::multipart::Form::new()
            .text("uploadToken", upload_token.to_string())
            .text("chunkIndex", chunk_index.to_string())
            .text("chunkHash", chunk_hash.to_string())
            .part("chunk", reqwest::multipart::Part::bytes(chunk_bytes));

        let resp = self
            .client
            .post(self.url("/upload/chunk"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::classify)?;
        decode_json(resp).await
    }

    async fn merge_file(&self, upload_token: &str, file_hash: &str, chunk_hashes: &[String]) -> Result<MergeFileResponse, UploadError> {
        let resp = self
            .client
            .post(self.url("/upload/merge"))
            .json(&MergeFileRequest {
                upload_token,
                file_hash,
                chunk_hashes,
            })
            .send()
            .await
            .map_err(Self::classify)?;
        decode_json(resp).await
    }
}

/// Shared response handling: a non-2xx status is mapped to an
/// `UploadError` using the status code as a coarse category, falling
/// back to the raw body text if it isn't the expected `{message}` shape.
async fn decode_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T, UploadError> {
    let status = resp.status();
    if status.is_success() {
        return resp.json().await.map_err(ReqwestAdapter::classify);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body).map(|b| b.message).unwrap_or(body);

    Err(match status.as_u16() {
        401 | 403 | 410 => UploadError::TokenExpired(message),
        404 => UploadError::NotFound(message),
        409 => UploadError::FileMismatch(message),
        422 => UploadError::IntegrityError(message),
        429 => UploadError::QuotaExceeded(message),
        503 => UploadError::StorageUnavailable(message),
        s if s >= 500 => UploadError::OperationFailed(message),
        _ => UploadError::InvalidArgument(message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_without_double_slash() {
        let adapter = ReqwestAdapter::new("http://localhost:8080/").unwrap();
        assert_eq!(adapter.url("/upload/create"), "http://localhost:8080/upload/create");
    }
}
