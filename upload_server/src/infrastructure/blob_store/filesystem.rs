//! Filesystem-backed `BlobStore`: content-addressed fan-out directories
//! (`<root>/objects/<hash[0..2]>/<hash>`) with atomic
//! write-to-temp-then-rename-then-fsync semantics, so a reader never
//! observes a partially written blob.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use upload_domain::services::blob_store::{BlobStore, ByteRange, ByteStream};
use upload_domain::UploadError;

pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// `root` is created (including the `objects/` subdirectory) on first
    /// use if missing.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        let fan_out = &hash[..hash.len().min(2)];
        self.root.join("objects").join(fan_out).join(hash)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, hash: &str, bytes: Bytes) -> Result<(), UploadError> {
        let final_path = self.path_for(hash);
        if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
            return Ok(());
        }

        let dir = final_path.parent().expect("fan-out directory always has a parent");
        tokio::fs::create_dir_all(dir).await?;

        let tmp_path = dir.join(format!(".{hash}.tmp-{}", std::process::id()));
        {
            let mut tmp_file = tokio::fs::File::create(&tmp_path).await?;
            tmp_file.write_all(&bytes).await?;
            tmp_file.sync_all().await?;
        }
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    async fn has(&self, hash: &str) -> Result<bool, UploadError> {
        Ok(tokio::fs::try_exists(self.path_for(hash)).await?)
    }

    async fn len(&self, hash: &str) -> Result<Option<u64>, UploadError> {
        match tokio::fs::metadata(self.path_for(hash)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn open_read(&self, hash: &str, range: Option<ByteRange>) -> Result<ByteStream, UploadError> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        let path = self.path_for(hash);
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|_| UploadError::NotFound(hash.to_string()))?;

        let bytes = if let Some(r) = range {
            file.seek(std::io::SeekFrom::Start(r.start)).await?;
            let mut buf = vec![0u8; r.len() as usize];
            file.read_exact(&mut buf).await?;
            Bytes::from(buf)
        } else {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).await?;
            Bytes::from(buf)
        };

        let stream = futures::stream::once(async move { Ok(bytes) });
        Ok(Box::pin(stream) as Pin<Box<dyn futures::Stream<Item = Result<Bytes, UploadError>> + Send>>)
    }
}

/// Ensures `root/objects` exists; called once at server startup.
pub async fn ensure_root(root: &Path) -> Result<(), UploadError> {
    tokio::fs::create_dir_all(root.join("objects")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_read_round_trips_and_fans_out_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        let hash = "ab".to_string() + &"c".repeat(30);
        store.put(&hash, Bytes::from_static(b"payload")).await.unwrap();

        assert!(store.has(&hash).await.unwrap());
        assert!(dir.path().join("objects").join("ab").join(&hash).exists());

        use futures::StreamExt;
        let mut stream = store.open_read(&hash, None).await.unwrap();
        let piece = stream.next().await.unwrap().unwrap();
        assert_eq!(&piece[..], b"payload");
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        let hash = "f".repeat(32);
        store.put(&hash, Bytes::from_static(b"one")).await.unwrap();
        store.put(&hash, Bytes::from_static(b"one")).await.unwrap();
        assert_eq!(store.len(&hash).await.unwrap(), Some(3));
    }
}
