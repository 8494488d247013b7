//! In-memory `BlobStore`, used by tests and the in-process `LocalAdapter`
//! demo path. No fsync equivalent applies; writes are visible to readers
//! as soon as the guarding mutex is released.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use upload_domain::services::blob_store::{BlobStore, ByteRange, ByteStream};
use upload_domain::UploadError;

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Bytes>>,
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, hash: &str, bytes: Bytes) -> Result<(), UploadError> {
        self.blobs.lock().entry(hash.to_string()).or_insert(bytes);
        Ok(())
    }

    async fn has(&self, hash: &str) -> Result<bool, UploadError> {
        Ok(self.blobs.lock().contains_key(hash))
    }

    async fn len(&self, hash: &str) -> Result<Option<u64>, UploadError> {
        Ok(self.blobs.lock().get(hash).map(|b| b.len() as u64))
    }

    async fn open_read(&self, hash: &str, range: Option<ByteRange>) -> Result<ByteStream, UploadError> {
        let full = self
            .blobs
            .lock()
            .get(hash)
            .cloned()
            .ok_or_else(|| UploadError::NotFound(hash.to_string()))?;

        let slice = match range {
            Some(r) => {
                let start = r.start as usize;
                let end = (r.end_inclusive as usize).min(full.len().saturating_sub(1));
                if start > end || start >= full.len() {
                    return Err(UploadError::invalid_argument("range out of bounds"));
                }
                full.slice(start..=end)
            }
            None => full,
        };

        let stream = futures::stream::once(async move { Ok(slice) });
        Ok(Box::pin(stream) as Pin<Box<dyn futures::Stream<Item = Result<Bytes, UploadError>> + Send>>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn put_is_idempotent_by_hash() {
        let store = InMemoryBlobStore::default();
        store.put("h1", Bytes::from_static(b"hello")).await.unwrap();
        store.put("h1", Bytes::from_static(b"hello")).await.unwrap();
        assert!(store.has("h1").await.unwrap());
        assert_eq!(store.len("h1").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn open_read_honors_a_range() {
        let store = InMemoryBlobStore::default();
        store.put("h1", Bytes::from_static(b"0123456789")).await.unwrap();
        let mut stream = store
            .open_read("h1", Some(ByteRange { start: 2, end_inclusive: 4 }))
            .await
            .unwrap();
        let piece = stream.next().await.unwrap().unwrap();
        assert_eq!(&piece[..], b"234");
    }

    #[tokio::test]
    async fn open_read_missing_hash_is_not_found() {
        let store = InMemoryBlobStore::default();
        assert!(store.open_read("missing", None).await.is_err());
    }
}
