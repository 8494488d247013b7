//! In-memory `MetadataStore`, used by tests and the `LocalAdapter` demo
//! path. Manifest/token maps are each guarded by their own mutex so a
//! manifest update never blocks a concurrent token lookup.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use upload_domain::services::metadata_store::{MetadataStore, TokenBinding};
use upload_domain::value_objects::manifest::{Manifest, ManifestStatus};
use upload_domain::UploadError;

#[derive(Default)]
pub struct InMemoryMetadataStore {
    manifests: Mutex<HashMap<String, Manifest>>,
    tokens: Mutex<HashMap<String, TokenBinding>>,
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn init(&self) -> Result<(), UploadError> {
        Ok(())
    }

    async fn put_manifest(&self, manifest: &Manifest) -> Result<(), UploadError> {
        self.manifests.lock().insert(manifest.file_id().to_string(), manifest.clone());
        Ok(())
    }

    async fn get_manifest(&self, file_id: &str) -> Result<Option<Manifest>, UploadError> {
        Ok(self.manifests.lock().get(file_id).cloned())
    }

    async fn update_manifest(&self, manifest: &Manifest) -> Result<(), UploadError> {
        self.manifests.lock().insert(manifest.file_id().to_string(), manifest.clone());
        Ok(())
    }

    async fn find_completed_manifest_by_file_hash(&self, file_hash: &str) -> Result<Option<Manifest>, UploadError> {
        Ok(self
            .manifests
            .lock()
            .values()
            .find(|m| m.status() == ManifestStatus::Completed && m.file_hash().map(|h| h.as_str()) == Some(file_hash))
            .cloned())
    }

    async fn delete_manifest(&self, file_id: &str) -> Result<(), UploadError> {
        self.manifests.lock().remove(file_id);
        Ok(())
    }

    async fn put_token(&self, token: &str, binding: TokenBinding) -> Result<(), UploadError> {
        self.tokens.lock().insert(token.to_string(), binding);
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<TokenBinding>, UploadError> {
        Ok(self.tokens.lock().get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_completed_manifest_ignores_pending_ones() {
        let store = InMemoryMetadataStore::default();
        let mut m = Manifest::new_pending("file-1", 1, 10, "text/plain", 0);
        store.put_manifest(&m).await.unwrap();
        assert!(store.find_completed_manifest_by_file_hash("h").await.unwrap().is_none());

        m.record_chunk(0, upload_domain::value_objects::digest::Digest::of_bytes(b"x"));
        m.complete(upload_domain::value_objects::digest::Digest::parse(&"a".repeat(32)).unwrap());
        store.update_manifest(&m).await.unwrap();
        assert!(store
            .find_completed_manifest_by_file_hash(&"a".repeat(32))
            .await
            .unwrap()
            .is_some());
    }
}
