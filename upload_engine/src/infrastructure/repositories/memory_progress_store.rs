//! In-memory `ProgressStore`, used by tests and the `LocalAdapter` demo
//! path. A single mutex is enough here — unlike the server's manifest/
//! token split, there is no independent-lookup axis worth separating.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use upload_domain::value_objects::upload_record::{UploadRecord, UploadRecordPatch};
use upload_domain::{ProgressStore, UploadError};

#[derive(Default)]
pub struct InMemoryProgressStore {
    records: Mutex<HashMap<String, UploadRecord>>,
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn init(&self) -> Result<(), UploadError> {
        Ok(())
    }

    async fn save_record(&self, record: &UploadRecord) -> Result<(), UploadError> {
        self.records.lock().insert(record.task_id().to_string(), record.clone());
        Ok(())
    }

    async fn get_record(&self, task_id: &str) -> Result<Option<UploadRecord>, UploadError> {
        Ok(self.records.lock().get(task_id).cloned())
    }

    async fn update_record(&self, task_id: &str, patch: UploadRecordPatch) -> Result<(), UploadError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(task_id)
            .ok_or_else(|| UploadError::NotFound(format!("progress record for task {task_id}")))?;
        record.apply_patch(patch, now_ms());
        Ok(())
    }

    async fn delete_record(&self, task_id: &str) -> Result<(), UploadError> {
        self.records.lock().remove(task_id);
        Ok(())
    }

    async fn get_all_records(&self) -> Result<Vec<UploadRecord>, UploadError> {
        Ok(self.records.lock().values().cloned().collect())
    }

    async fn clear_all(&self) -> Result<(), UploadError> {
        self.records.lock().clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), UploadError> {
        Ok(())
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use upload_domain::value_objects::file_info::FileInfo;

    fn sample_record() -> UploadRecord {
        UploadRecord::new("task-1", FileInfo::new("a.bin", 10, "application/octet-stream", 0).unwrap(), "tok", 0)
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = InMemoryProgressStore::default();
        store.save_record(&sample_record()).await.unwrap();
        let got = store.get_record("task-1").await.unwrap().unwrap();
        assert_eq!(got.task_id(), "task-1");
    }

    #[tokio::test]
    async fn update_unknown_record_is_not_found() {
        let store = InMemoryProgressStore::default();
        let err = store.update_record("missing", UploadRecordPatch::default()).await.unwrap_err();
        assert!(matches!(err, UploadError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_then_get_all_is_empty() {
        let store = InMemoryProgressStore::default();
        store.save_record(&sample_record()).await.unwrap();
        store.delete_record("task-1").await.unwrap();
        assert!(store.get_all_records().await.unwrap().is_empty());
    }
}
