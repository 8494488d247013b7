//! Metadata Store (C10 capability): atomic operations on `Manifest`s and
//! issued upload tokens.
//!
//! Manifest updates must be atomic — a reader observes either the old or
//! the new state, never a torn write — since `uploadChunk` calls for the
//! same file may race across concurrent client connections.

use async_trait::async_trait;

use crate::error::UploadError;
use crate::value_objects::manifest::Manifest;

/// A minted upload token's server-side binding: which file it belongs to
/// and when it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBinding {
    pub file_id: String,
    pub expires_at: i64,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn init(&self) -> Result<(), UploadError>;

    /// Persists a new pending manifest, keyed by `file_id`.
    async fn put_manifest(&self, manifest: &Manifest) -> Result<(), UploadError>;

    async fn get_manifest(&self, file_id: &str) -> Result<Option<Manifest>, UploadError>;

    /// Replaces the stored manifest for `manifest.file_id()` atomically.
    async fn update_manifest(&self, manifest: &Manifest) -> Result<(), UploadError>;

    /// Looks up any manifest whose `file_hash` matches `file_hash` and
    /// whose status is `completed` — the basis for instant-upload
    /// detection in `verifyHash`.
    async fn find_completed_manifest_by_file_hash(&self, file_hash: &str) -> Result<Option<Manifest>, UploadError>;

    async fn delete_manifest(&self, file_id: &str) -> Result<(), UploadError>;

    /// Records a newly minted token binding.
    async fn put_token(&self, token: &str, binding: TokenBinding) -> Result<(), UploadError>;

    async fn get_token(&self, token: &str) -> Result<Option<TokenBinding>, UploadError>;
}
