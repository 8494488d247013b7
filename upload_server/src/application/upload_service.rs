//! Server Upload Service (C11): implements the Request Adapter contract
//! server-side, using the Server Storage Engine (C10 — `BlobStore` +
//! `MetadataStore`) for content-addressed dedup and logical merge.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use upload_domain::services::blob_store::{BlobStore, ByteRange};
use upload_domain::services::metadata_store::{MetadataStore, TokenBinding};
use upload_domain::services::request_adapter::{CreateFileResponse, MergeFileResponse, UploadChunkResponse, VerifyHashResponse};
use upload_domain::value_objects::digest::Digest;
use upload_domain::value_objects::manifest::{Manifest, ManifestStatus};
use upload_domain::UploadError;

/// Server-side bounds and defaults, distinct from the client's
/// `ChunkSizeAdjuster` bounds: the server clamps whatever the client
/// negotiates, independent of the client's own min/max configuration.
#[derive(Debug, Clone, Copy)]
pub struct UploadServiceConfig {
    pub min_chunk_size: u64,
    pub max_chunk_size: u64,
    pub default_chunk_size: u64,
    pub token_ttl_ms: i64,
}

impl Default for UploadServiceConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 256 * 1024,
            max_chunk_size: 10 * 1024 * 1024,
            default_chunk_size: 1024 * 1024,
            token_ttl_ms: 24 * 60 * 60 * 1000,
        }
    }
}

/// A byte stream plus the metadata an HTTP handler needs to set
/// `Content-Type`/`Content-Length`/`Content-Range` headers.
pub struct FileStream {
    pub stream: upload_domain::services::blob_store::ByteStream,
    pub mime_type: String,
    pub total_size: u64,
    pub range: Option<ByteRange>,
}

pub struct UploadService {
    blob_store: Arc<dyn BlobStore>,
    metadata_store: Arc<dyn MetadataStore>,
    config: UploadServiceConfig,
}

impl UploadService {
    pub fn new(blob_store: Arc<dyn BlobStore>, metadata_store: Arc<dyn MetadataStore>, config: UploadServiceConfig) -> Self {
        Self {
            blob_store,
            metadata_store,
            config,
        }
    }

    /// Ensures backing stores are initialized (schema creation, directory
    /// layout). Idempotent.
    pub async fn init(&self) -> Result<(), UploadError> {
        self.metadata_store.init().await
    }

    pub async fn create_file(
        &self,
        file_name: &str,
        file_size: u64,
        file_type: &str,
        preferred_chunk_size: Option<u64>,
    ) -> Result<CreateFileResponse, UploadError> {
        if file_name.is_empty() {
            return Err(UploadError::invalid_argument("file_name must not be empty"));
        }

        let negotiated = preferred_chunk_size
            .map(|p| p.clamp(self.config.min_chunk_size, self.config.max_chunk_size))
            .unwrap_or(self.config.default_chunk_size);

        let chunk_count = if file_size == 0 { 0 } else { file_size.div_ceil(negotiated) as usize };

        let file_id = random_hex_id();
        let token = random_hex_id();
        let now = now_ms();

        let manifest = Manifest::new_pending(&file_id, chunk_count, file_size, file_type, now);
        self.metadata_store.put_manifest(&manifest).await?;
        self.metadata_store
            .put_token(
                &token,
                TokenBinding {
                    file_id: file_id.clone(),
                    expires_at: now + self.config.token_ttl_ms,
                },
            )
            .await?;

        info!(file_id = %file_id, chunk_count, negotiated, "file upload session created");
        Ok(CreateFileResponse {
            upload_token: token,
            negotiated_chunk_size: negotiated,
        })
    }

    pub async fn verify_hash(
        &self,
        upload_token: &str,
        file_hash: Option<&str>,
        chunk_hashes: Option<&[String]>,
    ) -> Result<VerifyHashResponse, UploadError> {
        let binding = self.require_token(upload_token).await?;

        if let Some(file_hash) = file_hash {
            if let Some(existing) = self.metadata_store.find_completed_manifest_by_file_hash(file_hash).await? {
                return Ok(VerifyHashResponse {
                    file_exists: true,
                    file_url: Some(file_url_for(existing.file_id())),
                    existing_chunks: Vec::new(),
                    missing_chunks: Vec::new(),
                });
            }
        }

        let mut existing_chunks = Vec::new();
        let mut missing_chunks = Vec::new();
        if let Some(chunk_hashes) = chunk_hashes {
            for (index, hash) in chunk_hashes.iter().enumerate() {
                if self.blob_store.has(hash).await? {
                    existing_chunks.push(index as u32);
                } else {
                    missing_chunks.push(index as u32);
                }
            }
        }
        let _ = binding;

        Ok(VerifyHashResponse {
            file_exists: false,
            file_url: None,
            existing_chunks,
            missing_chunks,
        })
    }

    pub async fn upload_chunk(
        &self,
        upload_token: &str,
        chunk_index: u32,
        chunk_hash: &str,
        chunk_bytes: bytes::Bytes,
    ) -> Result<UploadChunkResponse, UploadError> {
        let binding = self.require_token(upload_token).await?;

        let recomputed = Digest::of_bytes(&chunk_bytes);
        if recomputed.as_str() != chunk_hash {
            return Err(UploadError::integrity(format!(
                "chunk {chunk_index}: claimed hash {chunk_hash} does not match computed hash {}",
                recomputed.as_str()
            )));
        }

        self.blob_store.put(chunk_hash, chunk_bytes).await?;

        let mut manifest = self
            .metadata_store
            .get_manifest(&binding.file_id)
            .await?
            .ok_or_else(|| UploadError::NotFound(format!("manifest for file {}", binding.file_id)))?;
        manifest.record_chunk(chunk_index as usize, Digest::parse(chunk_hash)?);
        self.metadata_store.update_manifest(&manifest).await?;

        Ok(UploadChunkResponse {
            success: true,
            chunk_hash: chunk_hash.to_string(),
        })
    }

    pub async fn merge_file(
        &self,
        upload_token: &str,
        file_hash: &str,
        chunk_hashes: &[String],
    ) -> Result<MergeFileResponse, UploadError> {
        let binding = self.require_token(upload_token).await?;
        let mut manifest = self
            .metadata_store
            .get_manifest(&binding.file_id)
            .await?
            .ok_or_else(|| UploadError::NotFound(format!("manifest for file {}", binding.file_id)))?;

        if !manifest.is_fully_received() {
            return Err(UploadError::invalid_argument("not every chunk index has been received"));
        }
        let received: Vec<String> = manifest.received_chunk_hashes().into_iter().map(|d| d.to_string()).collect();
        if received != chunk_hashes {
            return Err(UploadError::invalid_argument("received chunk hashes do not match the supplied ordered list"));
        }

        manifest.complete(Digest::parse(file_hash)?);
        self.metadata_store.update_manifest(&manifest).await?;

        info!(file_id = %binding.file_id, "file merged (logical only)");
        Ok(MergeFileResponse {
            success: true,
            file_url: file_url_for(&binding.file_id),
            file_id: binding.file_id,
        })
    }

    pub async fn get_file_stream(&self, file_id: &str, range: Option<ByteRange>) -> Result<FileStream, UploadError> {
        let manifest = self
            .metadata_store
            .get_manifest(file_id)
            .await?
            .ok_or_else(|| UploadError::NotFound(format!("file {file_id}")))?;
        if manifest.status() != ManifestStatus::Completed {
            return Err(UploadError::NotFound(format!("file {file_id} is not complete")));
        }

        let stream = build_ordered_stream(self.blob_store.clone(), manifest.received_chunk_hashes().into_iter().cloned().collect(), range);
        Ok(FileStream {
            stream,
            mime_type: manifest.mime_type().to_string(),
            total_size: manifest.total_size(),
            range,
        })
    }

    async fn require_token(&self, token: &str) -> Result<TokenBinding, UploadError> {
        let binding = self
            .metadata_store
            .get_token(token)
            .await?
            .ok_or_else(|| UploadError::TokenExpired("unknown upload token".into()))?;
        if binding.expires_at <= now_ms() {
            return Err(UploadError::TokenExpired(format!("token expired at {}", binding.expires_at)));
        }
        let _ = &binding;
        Ok(binding)
    }
}

/// Assembles an ordered, optionally-ranged read across a manifest's chunk
/// blobs on the fly. One stream item per overlapping chunk; chunks fully
/// outside `range` are skipped without a store read beyond `len`.
///
/// Chunk boundaries are not known ahead of time (the manifest stores
/// hashes, not sizes), so they are resolved lazily via `BlobStore::len`,
/// accumulating a running offset as the fold walks the ordered hash list.
fn build_ordered_stream(blob_store: Arc<dyn BlobStore>, chunk_hashes: Vec<Digest>, range: Option<ByteRange>) -> upload_domain::services::blob_store::ByteStream {
    use std::collections::VecDeque;

    let state = (VecDeque::from(chunk_hashes), 0u64, blob_store, range);
    let stream = futures::stream::unfold(state, |(mut queue, mut offset, blob_store, range)| async move {
        loop {
            let hash = queue.pop_front()?;

            let len = match blob_store.len(hash.as_str()).await {
                Ok(Some(l)) => l,
                Ok(None) => return Some((Err(UploadError::NotFound(hash.to_string())), (queue, offset, blob_store, range))),
                Err(e) => return Some((Err(e), (queue, offset, blob_store, range))),
            };
            let chunk_start = offset;
            let chunk_end_inclusive = chunk_start + len - 1;
            offset += len;

            let read_range = match range {
                None => None,
                Some(r) if chunk_end_inclusive < r.start || chunk_start > r.end_inclusive => continue,
                Some(r) => Some(ByteRange {
                    start: r.start.max(chunk_start) - chunk_start,
                    end_inclusive: r.end_inclusive.min(chunk_end_inclusive) - chunk_start,
                }),
            };

            return Some((read_whole_chunk(&*blob_store, hash.as_str(), read_range).await, (queue, offset, blob_store, range)));
        }
    });

    Box::pin(stream)
}

/// Reads an entire (possibly ranged) chunk into one contiguous `Bytes`
/// value, so the outer ordered stream can yield one item per chunk.
async fn read_whole_chunk(blob_store: &dyn BlobStore, hash: &str, range: Option<ByteRange>) -> Result<bytes::Bytes, UploadError> {
    use futures::TryStreamExt;

    let inner = blob_store.open_read(hash, range).await?;
    let buf = inner.try_fold(Vec::new(), |mut acc, piece| async move {
        acc.extend_from_slice(&piece);
        Ok(acc)
    }).await?;
    Ok(bytes::Bytes::from(buf))
}

fn random_hex_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

fn file_url_for(file_id: &str) -> String {
    format!("/files/{file_id}")
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
