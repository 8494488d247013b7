//! Per-chunk plan entries (C9 Protocol Types, client side).

use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::value_objects::digest::Digest;

/// One slice of a task's chunk plan.
///
/// `index` is 0-based and dense within a task; `start`/`end` are byte
/// offsets with `end - start == size`. A well-formed plan additionally
/// satisfies, across the whole `Vec<ChunkInfo>`: `chunks[0].start == 0`,
/// `chunks[i].end == chunks[i+1].start`, and `chunks[last].end ==
/// file_size` — enforced by [`build_plan`], not by this type alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    index: u32,
    start: u64,
    end: u64,
    hash: Option<Digest>,
}

impl ChunkInfo {
    /// Builds a single chunk slice. `end` must be strictly greater than
    /// `start` (chunks are never empty).
    pub fn new(index: u32, start: u64, end: u64) -> Result<Self, UploadError> {
        if end <= start {
            return Err(UploadError::invalid_argument(format!(
                "chunk {index}: end ({end}) must be > start ({start})"
            )));
        }
        Ok(Self {
            index,
            start,
            end,
            hash: None,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn hash(&self) -> Option<&Digest> {
        self.hash.as_ref()
    }

    /// Records the computed per-chunk digest once hashing finishes.
    pub fn set_hash(&mut self, hash: Digest) {
        self.hash = Some(hash);
    }
}

/// Slices a file of `file_size` bytes into a dense, ordered chunk plan
/// using `chunk_size` for every chunk but the (possibly shorter) final
/// one.
///
/// This is the byte-range half of the Digest & Slicer component (C1): it
/// never copies bytes, only computes the `[start, end)` boundaries that
/// the engine's I/O layer later reads from.
pub fn build_plan(file_size: u64, chunk_size: u64) -> Result<Vec<ChunkInfo>, UploadError> {
    if chunk_size == 0 {
        return Err(UploadError::invalid_argument("chunk_size must be > 0"));
    }
    if file_size == 0 {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    let mut start = 0u64;
    let mut index = 0u32;
    while start < file_size {
        let end = (start + chunk_size).min(file_size);
        chunks.push(ChunkInfo::new(index, start, end)?);
        start = end;
        index += 1;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_span() {
        assert!(ChunkInfo::new(0, 10, 10).is_err());
        assert!(ChunkInfo::new(0, 10, 5).is_err());
    }

    #[test]
    fn build_plan_produces_contiguous_dense_chunks() {
        // 2.5 MiB file, 1 MiB chunks -> 3 chunks: 1 MiB, 1 MiB, 0.5 MiB.
        let file_size = 2 * 1024 * 1024 + 512 * 1024;
        let chunk_size = 1024 * 1024;
        let plan = build_plan(file_size, chunk_size).unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].start(), 0);
        assert_eq!(plan.last().unwrap().end(), file_size);
        for w in plan.windows(2) {
            assert_eq!(w[0].end(), w[1].start());
        }
        assert_eq!(plan[0].size(), chunk_size);
        assert_eq!(plan[1].size(), chunk_size);
        assert_eq!(plan[2].size(), 512 * 1024);
    }

    #[test]
    fn build_plan_on_empty_file_is_empty() {
        assert!(build_plan(0, 1024).unwrap().is_empty());
    }

    #[test]
    fn build_plan_rejects_zero_chunk_size() {
        assert!(build_plan(100, 0).is_err());
    }
}
