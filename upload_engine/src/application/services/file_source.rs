//! File access abstraction feeding the Digest & Slicer component (C1).
//!
//! The domain's `ChunkHasher`/`Digest` stay synchronous by design (hashing
//! is CPU-bound); this trait is the async-I/O boundary around them. The
//! actual read-and-hash work runs inside `spawn_blocking`, and this
//! trait is what `UploadTask` depends on so it never talks to the
//! filesystem directly.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use upload_domain::value_objects::digest::{ChunkHasher, Digest, StreamingHasher};
use upload_domain::UploadError;

/// Recommended streaming read window for whole-file hashing (§4.1): 2 MiB.
pub const HASH_READ_WINDOW: usize = 2 * 1024 * 1024;

#[async_trait]
pub trait FileSource: Send + Sync {
    /// Total size of the underlying file, in bytes.
    async fn size(&self) -> Result<u64, UploadError>;

    /// Reads the byte range `[start, end)` without copying beyond what
    /// the caller asked for.
    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, UploadError>;

    /// Streams the whole file through a digest in bounded-memory windows,
    /// invoking `on_progress` with a 0.0..=100.0 percentage after each
    /// window. Determinism holds regardless of window size.
    async fn compute_hash(&self, on_progress: Arc<dyn Fn(f64) + Send + Sync>) -> Result<Digest, UploadError>;
}

/// A [`FileSource`] backed by a path on the local filesystem.
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    async fn size(&self) -> Result<u64, UploadError> {
        let meta = tokio::fs::metadata(&self.path).await?;
        Ok(meta.len())
    }

    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, UploadError> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(std::io::SeekFrom::Start(start)).await?;
        let len = (end - start) as usize;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn compute_hash(&self, on_progress: Arc<dyn Fn(f64) + Send + Sync>) -> Result<Digest, UploadError> {
        use std::io::Read;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<Digest, UploadError> {
            let mut file = std::fs::File::open(&path)?;
            let total = file.metadata()?.len();
            if total == 0 {
                on_progress(100.0);
                return Ok(Digest::of_empty());
            }

            let mut hasher = StreamingHasher::default();
            let mut window = vec![0u8; HASH_READ_WINDOW];
            let mut read_so_far = 0u64;
            loop {
                let n = file.read(&mut window)?;
                if n == 0 {
                    break;
                }
                hasher.update(&window[..n]);
                read_so_far += n as u64;
                on_progress((read_so_far as f64 / total as f64) * 100.0);
            }
            Ok(hasher.finalize())
        })
        .await
        .map_err(|e| UploadError::internal(format!("hash task panicked: {e}")))?
    }
}

/// An in-memory [`FileSource`], used by tests and same-process demos
/// where the "file" is already resident as bytes.
pub struct InMemoryFileSource {
    bytes: Vec<u8>,
}

impl InMemoryFileSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl FileSource for InMemoryFileSource {
    async fn size(&self) -> Result<u64, UploadError> {
        Ok(self.bytes.len() as u64)
    }

    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, UploadError> {
        let (start, end) = (start as usize, end as usize);
        if end > self.bytes.len() || start > end {
            return Err(UploadError::invalid_argument("range out of bounds"));
        }
        Ok(self.bytes[start..end].to_vec())
    }

    async fn compute_hash(&self, on_progress: Arc<dyn Fn(f64) + Send + Sync>) -> Result<Digest, UploadError> {
        if self.bytes.is_empty() {
            on_progress(100.0);
            return Ok(Digest::of_empty());
        }
        let mut hasher = StreamingHasher::default();
        let total = self.bytes.len();
        let mut read_so_far = 0usize;
        for window in self.bytes.chunks(HASH_READ_WINDOW) {
            hasher.update(window);
            read_so_far += window.len();
            on_progress((read_so_far as f64 / total as f64) * 100.0);
        }
        Ok(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_hash_matches_digest_of_whole_buffer() {
        let data = vec![7u8; HASH_READ_WINDOW + 100];
        let source = InMemoryFileSource::new(data.clone());
        let progresses = Arc::new(std::sync::Mutex::new(Vec::new()));
        let progresses2 = progresses.clone();
        let hash = source
            .compute_hash(Arc::new(move |p| progresses2.lock().unwrap().push(p)))
            .await
            .unwrap();
        assert_eq!(hash, Digest::of_bytes(&data));
        let seen = progresses.lock().unwrap();
        assert_eq!(*seen.last().unwrap(), 100.0);
    }

    #[tokio::test]
    async fn in_memory_read_range_rejects_out_of_bounds() {
        let source = InMemoryFileSource::new(vec![1, 2, 3]);
        assert!(source.read_range(0, 10).await.is_err());
    }

    #[tokio::test]
    async fn empty_file_yields_well_defined_empty_digest() {
        let source = InMemoryFileSource::new(Vec::new());
        let hash = source.compute_hash(Arc::new(|_| {})).await.unwrap();
        assert_eq!(hash, Digest::of_empty());
    }
}
