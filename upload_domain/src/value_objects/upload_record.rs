//! Persisted client-side progress record (C5 Progress Store schema).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::value_objects::file_info::FileInfo;

/// The only client-side state that crosses a process restart. Everything
/// else an `UploadTask` holds (chunk plan, adjuster state, in-flight
/// futures) is reconstructable from this plus a re-selected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    task_id: String,
    file_info: FileInfo,
    uploaded_chunks: BTreeSet<u32>,
    /// Opaque — the engine never interprets this beyond round-tripping it
    /// back to the `RequestAdapter` on resume.
    upload_token: String,
    created_at: i64,
    updated_at: i64,
}

impl UploadRecord {
    pub fn new(task_id: impl Into<String>, file_info: FileInfo, upload_token: impl Into<String>, now: i64) -> Self {
        Self {
            task_id: task_id.into(),
            file_info,
            uploaded_chunks: BTreeSet::new(),
            upload_token: upload_token.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn file_info(&self) -> &FileInfo {
        &self.file_info
    }

    pub fn uploaded_chunks(&self) -> &BTreeSet<u32> {
        &self.uploaded_chunks
    }

    pub fn upload_token(&self) -> &str {
        &self.upload_token
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Marks a chunk index uploaded and stamps `updated_at`. `task_id` and
    /// `created_at` never change after construction.
    pub fn mark_chunk_uploaded(&mut self, index: u32, now: i64) {
        self.uploaded_chunks.insert(index);
        self.updated_at = now;
    }

    /// Read-modify-write patch application used by `ProgressStore::update_record`.
    /// Fields left `None` in the patch are preserved; `updated_at` is always
    /// stamped regardless of which fields changed.
    pub fn apply_patch(&mut self, patch: UploadRecordPatch, now: i64) {
        if let Some(chunks) = patch.uploaded_chunks {
            self.uploaded_chunks = chunks;
        }
        if let Some(token) = patch.upload_token {
            self.upload_token = token;
        }
        self.updated_at = now;
    }
}

/// A partial update to an [`UploadRecord`]. `task_id` is deliberately
/// absent — it is immutable under update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadRecordPatch {
    pub uploaded_chunks: Option<BTreeSet<u32>>,
    pub upload_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file_info() -> FileInfo {
        FileInfo::new("a.bin", 100, "application/octet-stream", 0).unwrap()
    }

    #[test]
    fn mark_chunk_uploaded_stamps_updated_at() {
        let mut record = UploadRecord::new("task-1", sample_file_info(), "tok", 100);
        record.mark_chunk_uploaded(0, 200);
        assert!(record.uploaded_chunks().contains(&0));
        assert_eq!(record.updated_at(), 200);
        assert_eq!(record.created_at(), 100);
    }

    #[test]
    fn apply_empty_patch_preserves_fields_but_bumps_updated_at() {
        let mut record = UploadRecord::new("task-1", sample_file_info(), "tok", 100);
        record.mark_chunk_uploaded(0, 150);

        let before = record.clone();
        record.apply_patch(UploadRecordPatch::default(), 300);

        assert_eq!(record.uploaded_chunks(), before.uploaded_chunks());
        assert_eq!(record.upload_token(), before.upload_token());
        assert_eq!(record.task_id(), before.task_id());
        assert!(record.updated_at() >= before.updated_at());
    }

    #[test]
    fn task_id_is_immutable_across_patches() {
        let mut record = UploadRecord::new("task-1", sample_file_info(), "tok", 100);
        record.apply_patch(
            UploadRecordPatch {
                upload_token: Some("new-tok".into()),
                ..Default::default()
            },
            400,
        );
        assert_eq!(record.task_id(), "task-1");
        assert_eq!(record.upload_token(), "new-tok");
    }
}
