//! File-level metadata (C9 Protocol Types, client side).

use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::value_objects::digest::Digest;

/// Immutable description of the file a task is uploading.
///
/// Every field is fixed at construction except `file_hash`, which starts
/// `None` and is set exactly once when the hash stream completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    name: String,
    size: u64,
    mime_type: String,
    last_modified: i64,
    file_hash: Option<Digest>,
}

impl FileInfo {
    /// Builds a new `FileInfo`. `size` must fit a non-negative byte count;
    /// since the field type is already unsigned, the only rejected input
    /// is an empty `name`.
    pub fn new(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        last_modified: i64,
    ) -> Result<Self, UploadError> {
        let name = name.into();
        if name.is_empty() {
            return Err(UploadError::invalid_argument("file name must not be empty"));
        }
        Ok(Self {
            name,
            size,
            mime_type: mime_type.into(),
            last_modified,
            file_hash: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    pub fn file_hash(&self) -> Option<&Digest> {
        self.file_hash.as_ref()
    }

    /// Sets the file hash once the hash stream has finished.
    ///
    /// Calling this a second time is a programmer error in the engine
    /// (the hash pipeline only completes once per task) but is tolerated
    /// here — the later value simply overwrites the earlier one — since
    /// the domain layer does not track "has been set" as separate state.
    pub fn set_file_hash(&mut self, hash: Digest) {
        self.file_hash = Some(hash);
    }

    /// Validates that `self` matches the identity fields of a previously
    /// persisted `FileInfo`, used by the resume workflow (C8). Returns the
    /// first mismatch found, matching the order name → size → type from
    /// the resume contract. `last_modified` is informational only and is
    /// never compared.
    pub fn matches_for_resume(&self, stored: &FileInfo) -> Result<(), UploadError> {
        if self.name != stored.name {
            return Err(UploadError::FileMismatch(format!(
                "File name mismatch: expected {}, got {}",
                stored.name, self.name
            )));
        }
        if self.size != stored.size {
            return Err(UploadError::FileMismatch(format!(
                "File size mismatch: expected {}, got {}",
                stored.size, self.size
            )));
        }
        if self.mime_type != stored.mime_type {
            return Err(UploadError::FileMismatch(format!(
                "File type mismatch: expected {}, got {}",
                stored.mime_type, self.mime_type
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(FileInfo::new("", 10, "text/plain", 0).is_err());
    }

    #[test]
    fn file_hash_starts_unset_and_can_be_set_once() {
        let mut f = FileInfo::new("a.bin", 10, "application/octet-stream", 0).unwrap();
        assert!(f.file_hash().is_none());
        f.set_file_hash(Digest::of_empty());
        assert_eq!(f.file_hash(), Some(&Digest::of_empty()));
    }

    #[test]
    fn resume_match_detects_name_mismatch_first() {
        let stored = FileInfo::new("a.bin", 10, "text/plain", 0).unwrap();
        let candidate = FileInfo::new("b.bin", 20, "image/png", 0).unwrap();
        let err = candidate.matches_for_resume(&stored).unwrap_err();
        assert!(err.to_string().contains("File name mismatch"));
    }

    #[test]
    fn resume_match_detects_size_then_type_mismatch() {
        let stored = FileInfo::new("a.bin", 10, "text/plain", 0).unwrap();
        let size_mismatch = FileInfo::new("a.bin", 20, "text/plain", 0).unwrap();
        assert!(size_mismatch
            .matches_for_resume(&stored)
            .unwrap_err()
            .to_string()
            .contains("File size mismatch"));

        let type_mismatch = FileInfo::new("a.bin", 10, "image/png", 0).unwrap();
        assert!(type_mismatch
            .matches_for_resume(&stored)
            .unwrap_err()
            .to_string()
            .contains("File type mismatch"));
    }

    #[test]
    fn resume_match_ignores_last_modified() {
        let stored = FileInfo::new("a.bin", 10, "text/plain", 1_000).unwrap();
        let candidate = FileInfo::new("a.bin", 10, "text/plain", 999_999).unwrap();
        assert!(candidate.matches_for_resume(&stored).is_ok());
    }
}
