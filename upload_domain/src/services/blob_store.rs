//! Blob Store (C10 capability): content-addressed byte storage.
//!
//! Chunks are put once per unique hash, read many times, and never
//! deleted. The content-addressing invariant — `digest(read(h)) == h` for
//! any `h` present in the store — is the basis for the dedup and
//! durability guarantees the storage engine makes; it is verified by the
//! service layer on write (`uploadChunk` recomputes the hash of the
//! delivered bytes before calling `put`), not re-verified on every read.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::UploadError;

/// An inclusive byte range, used to request a partial read of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end_inclusive: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end_inclusive - self.start + 1
    }
}

/// A stream of byte chunks making up a (possibly partial) blob read.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, UploadError>> + Send>>;

/// Content-addressed put/get/has over opaque byte blobs, keyed by the
/// platform's 32-hex digest.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `hash`. Idempotent: a second `put` of the same
    /// `(hash, bytes)` pair is a no-op success. Implementations must fsync
    /// (or the storage-backend equivalent) before returning `Ok`.
    async fn put(&self, hash: &str, bytes: Bytes) -> Result<(), UploadError>;

    /// Whether a blob for `hash` is already stored.
    async fn has(&self, hash: &str) -> Result<bool, UploadError>;

    /// Byte length of the stored blob, if present.
    async fn len(&self, hash: &str) -> Result<Option<u64>, UploadError>;

    /// Opens a read stream for `hash`, optionally restricted to `range`.
    /// Returns `UploadError::NotFound` if the hash is not stored.
    async fn open_read(&self, hash: &str, range: Option<ByteRange>) -> Result<ByteStream, UploadError>;
}
