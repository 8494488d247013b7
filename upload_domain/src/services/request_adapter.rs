//! Request Adapter (C6): the four protocol capabilities the engine drives
//! a server (or any other counterparty) through.
//!
//! The engine treats `RequestAdapter` purely as an injected capability —
//! transport choice, authentication, TLS, timeouts, and transport-level
//! retry are the adapter author's concern. `upload_engine` ships a
//! `reqwest`-backed adapter for real HTTP and an in-process adapter for
//! same-binary client/server testing; either satisfies this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Response to `createFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileResponse {
    pub upload_token: String,
    pub negotiated_chunk_size: u64,
}

/// Response to `verifyHash`.
///
/// `existing_chunks`/`missing_chunks` are index lists into the *client's*
/// supplied chunk order — the server has no authoritative chunking of its
/// own (see the open question in the design notes).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyHashResponse {
    pub file_exists: bool,
    pub file_url: Option<String>,
    pub existing_chunks: Vec<u32>,
    pub missing_chunks: Vec<u32>,
}

/// Response to `uploadChunk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadChunkResponse {
    pub success: bool,
    pub chunk_hash: String,
}

/// Response to `mergeFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeFileResponse {
    pub success: bool,
    pub file_url: String,
    pub file_id: String,
}

/// The four idempotent-on-identical-inputs capabilities an `UploadTask`
/// drives. Every method is async: this is explicitly an I/O boundary, not
/// domain logic.
#[async_trait]
pub trait RequestAdapter: Send + Sync {
    /// Negotiates a new upload session. The server may override
    /// `preferred_chunk_size`; the returned `negotiated_chunk_size` is
    /// authoritative for the whole task plan (no mid-upload renegotiation).
    async fn create_file(
        &self,
        file_name: &str,
        file_size: u64,
        file_type: &str,
        preferred_chunk_size: Option<u64>,
    ) -> Result<CreateFileResponse, UploadError>;

    /// Checks whether the whole file (by `file_hash`) or individual chunks
    /// (by `chunk_hashes`, in the client's chunk-plan order) already exist
    /// on the server.
    async fn verify_hash(
        &self,
        upload_token: &str,
        file_hash: Option<&str>,
        chunk_hashes: Option<&[String]>,
    ) -> Result<VerifyHashResponse, UploadError>;

    /// Delivers one chunk's bytes. The server is expected to recompute the
    /// digest of the delivered bytes and reject on mismatch.
    async fn upload_chunk(
        &self,
        upload_token: &str,
        chunk_index: u32,
        chunk_hash: &str,
        chunk_bytes: Vec<u8>,
    ) -> Result<UploadChunkResponse, UploadError>;

    /// Finalizes the file as the ordered concatenation of `chunk_hashes`.
    /// Logical only: no bytes are copied by this call.
    async fn merge_file(
        &self,
        upload_token: &str,
        file_hash: &str,
        chunk_hashes: &[String],
    ) -> Result<MergeFileResponse, UploadError>;
}
