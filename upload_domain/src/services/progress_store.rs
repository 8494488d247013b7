//! Progress Store (C5): persistent key/value of in-flight upload records.

use async_trait::async_trait;

use crate::error::UploadError;
use crate::value_objects::upload_record::{UploadRecord, UploadRecordPatch};

/// Keyed by `taskId`. Implementations must taxonomize every failure as
/// one of `UploadError::QuotaExceeded`, `UploadError::StorageUnavailable`,
/// or `UploadError::OperationFailed` — the manager relies on being able to
/// match on `StorageUnavailable` to decide whether to degrade to
/// in-memory operation.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Opens (or creates) the backing store. Called once before any other
    /// method.
    async fn init(&self) -> Result<(), UploadError>;

    async fn save_record(&self, record: &UploadRecord) -> Result<(), UploadError>;

    async fn get_record(&self, task_id: &str) -> Result<Option<UploadRecord>, UploadError>;

    /// Read-modify-write: fields left `None` in `patch` are preserved;
    /// `updated_at` is stamped regardless. `task_id` is immutable.
    async fn update_record(&self, task_id: &str, patch: UploadRecordPatch) -> Result<(), UploadError>;

    async fn delete_record(&self, task_id: &str) -> Result<(), UploadError>;

    /// All records, in no particular guaranteed order; callers sort if
    /// they need a stable presentation order.
    async fn get_all_records(&self) -> Result<Vec<UploadRecord>, UploadError>;

    async fn clear_all(&self) -> Result<(), UploadError>;

    /// Releases any held resources (connections, file handles). Idempotent.
    async fn close(&self) -> Result<(), UploadError>;
}
