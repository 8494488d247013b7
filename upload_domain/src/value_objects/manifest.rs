//! Server-side storage metadata (C10 Server Storage Engine).

use serde::{Deserialize, Serialize};

use crate::value_objects::digest::Digest;

/// Completion state of a [`Manifest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    Pending,
    Completed,
}

/// `fileId -> ordered chunk hashes` plus bookkeeping.
///
/// A `Manifest` is the *logical merge* of a file: it never holds bytes,
/// only an ordered reference list into the content-addressed
/// [`StoredChunk`] space. Deleting a file removes its `Manifest` only;
/// the chunks it referenced persist, since they may be shared by other
/// manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    file_id: String,
    /// Index-ordered; `chunk_hashes[i]` is the chunk at plan index `i`.
    /// `None` entries mark indices not yet received.
    chunk_hashes: Vec<Option<Digest>>,
    total_size: u64,
    mime_type: String,
    status: ManifestStatus,
    file_hash: Option<Digest>,
    created_at: i64,
}

impl Manifest {
    /// Creates a pending manifest with `chunk_count` unfilled slots.
    pub fn new_pending(file_id: impl Into<String>, chunk_count: usize, total_size: u64, mime_type: impl Into<String>, now: i64) -> Self {
        Self {
            file_id: file_id.into(),
            chunk_hashes: vec![None; chunk_count],
            total_size,
            mime_type: mime_type.into(),
            status: ManifestStatus::Pending,
            file_hash: None,
            created_at: now,
        }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn status(&self) -> ManifestStatus {
        self.status
    }

    pub fn file_hash(&self) -> Option<&Digest> {
        self.file_hash.as_ref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Chunk hash recorded at `index`, if that slot has been received.
    pub fn chunk_hash_at(&self, index: usize) -> Option<&Digest> {
        self.chunk_hashes.get(index).and_then(|slot| slot.as_ref())
    }

    /// All received chunk hashes, in plan order, skipping empty slots.
    pub fn received_chunk_hashes(&self) -> Vec<&Digest> {
        self.chunk_hashes.iter().filter_map(|slot| slot.as_ref()).collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_hashes.len()
    }

    /// Records the hash received for a chunk index. Growing the manifest
    /// beyond its original plan size is not supported; indices out of
    /// range are silently ignored by callers, which must check
    /// `chunk_count()` first (the service layer does this while validating
    /// the request).
    pub fn record_chunk(&mut self, index: usize, hash: Digest) {
        if let Some(slot) = self.chunk_hashes.get_mut(index) {
            *slot = Some(hash);
        }
    }

    /// Whether every plan index has a recorded chunk hash.
    pub fn is_fully_received(&self) -> bool {
        self.chunk_hashes.iter().all(|slot| slot.is_some())
    }

    /// Marks the manifest completed and binds the whole-file hash. Callers
    /// (the service layer) are responsible for having already verified
    /// `is_fully_received()` and that the received hashes match the
    /// caller-supplied ordered list bit-for-bit.
    pub fn complete(&mut self, file_hash: Digest) {
        self.status = ManifestStatus::Completed;
        self.file_hash = Some(file_hash);
    }
}

/// A content-addressed blob reference: `chunk_hash -> storage locator`.
///
/// `StoredChunk` carries no back-reference to any `Manifest`; the
/// relationship is one-directional (manifests point at chunks), which is
/// what allows chunk puts to be shared across files without bookkeeping
/// at the chunk layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChunk {
    hash: Digest,
    byte_length: u64,
}

impl StoredChunk {
    pub fn new(hash: Digest, byte_length: u64) -> Self {
        Self { hash, byte_length }
    }

    pub fn hash(&self) -> &Digest {
        &self.hash
    }

    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }
}
