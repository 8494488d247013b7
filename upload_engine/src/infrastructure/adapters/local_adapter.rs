//! In-process `RequestAdapter` (C6): drives an `upload_server::UploadService`
//! directly, without a network hop. Used by same-binary demos and by the
//! task state machine's own test suite, pairing a real and an in-process
//! implementation behind the same port trait.

use std::sync::Arc;

use async_trait::async_trait;

use upload_domain::services::request_adapter::{CreateFileResponse, MergeFileResponse, UploadChunkResponse, VerifyHashResponse};
use upload_domain::{RequestAdapter, UploadError};
use upload_server::application::UploadService;

/// Wraps a shared `UploadService` so an `UploadTask` can talk to it
/// through the same `RequestAdapter` port a real HTTP client would use.
pub struct LocalAdapter {
    service: Arc<UploadService>,
}

impl LocalAdapter {
    pub fn new(service: Arc<UploadService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RequestAdapter for LocalAdapter {
    async fn create_file(
        &self,
        file_name: &str,
        file_size: u64,
        file_type: &str,
        preferred_chunk_size: Option<u64>,
    ) -> Result<CreateFileResponse, UploadError> {
        self.service.create_file(file_name, file_size, file_type, preferred_chunk_size).await
    }

    async fn verify_hash(
        &self,
        upload_token: &str,
        file_hash: Option<&str>,
        chunk_hashes: Option<&[String]>,
    ) -> Result<VerifyHashResponse, UploadError> {
        self.service.verify_hash(upload_token, file_hash, chunk_hashes).await
    }

    async fn upload_chunk(
        &self,
        upload_token: &str,
        chunk_index: u32,
        chunk_hash: &str,
        chunk_bytes: Vec<u8>,
    ) -> Result<UploadChunkResponse, UploadError> {
        self.service.upload_chunk(upload_token, chunk_index, chunk_hash, bytes::Bytes::from(chunk_bytes)).await
    }

    async fn merge_file(&self, upload_token: &str, file_hash: &str, chunk_hashes: &[String]) -> Result<MergeFileResponse, UploadError> {
        self.service.merge_file(upload_token, file_hash, chunk_hashes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upload_server::application::UploadServiceConfig;
    use upload_server::infrastructure::blob_store::memory::InMemoryBlobStore;
    use upload_server::infrastructure::metadata_store::memory::InMemoryMetadataStore;

    #[tokio::test]
    async fn create_file_round_trips_through_the_service() {
        let service = Arc::new(UploadService::new(
            Arc::new(InMemoryBlobStore::default()),
            Arc::new(InMemoryMetadataStore::default()),
            UploadServiceConfig::default(),
        ));
        let adapter = LocalAdapter::new(service);
        let resp = adapter.create_file("a.bin", 1024, "application/octet-stream", None).await.unwrap();
        assert!(!resp.upload_token.is_empty());
    }
}
