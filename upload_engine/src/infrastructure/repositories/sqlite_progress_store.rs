//! SQLite-backed `ProgressStore` (C5), used by the CLI client so an
//! in-flight upload survives a process restart. Records are stored as a
//! JSON blob alongside an indexed `task_id` so a resume lookup is a
//! single keyed fetch, the same storage shape as the server's
//! `SqliteMetadataStore`.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use upload_domain::value_objects::upload_record::{UploadRecord, UploadRecordPatch};
use upload_domain::{ProgressStore, UploadError};

pub struct SqliteProgressStore {
    pool: SqlitePool,
}

impl SqliteProgressStore {
    pub async fn connect(database_url: &str) -> Result<Self, UploadError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .map_err(storage_err)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn init(&self) -> Result<(), UploadError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS progress_records (
                task_id TEXT PRIMARY KEY,
                data    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn save_record(&self, record: &UploadRecord) -> Result<(), UploadError> {
        let data = serde_json::to_string(record)?;
        sqlx::query("INSERT OR REPLACE INTO progress_records (task_id, data) VALUES (?1, ?2)")
            .bind(record.task_id())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get_record(&self, task_id: &str) -> Result<Option<UploadRecord>, UploadError> {
        let row = sqlx::query("SELECT data FROM progress_records WHERE task_id = ?1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| deserialize_record(r.get::<String, _>("data"))).transpose()
    }

    async fn update_record(&self, task_id: &str, patch: UploadRecordPatch) -> Result<(), UploadError> {
        let mut record = self
            .get_record(task_id)
            .await?
            .ok_or_else(|| UploadError::NotFound(format!("progress record for task {task_id}")))?;
        record.apply_patch(patch, now_ms());
        self.save_record(&record).await
    }

    async fn delete_record(&self, task_id: &str) -> Result<(), UploadError> {
        sqlx::query("DELETE FROM progress_records WHERE task_id = ?1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get_all_records(&self) -> Result<Vec<UploadRecord>, UploadError> {
        let rows = sqlx::query("SELECT data FROM progress_records").fetch_all(&self.pool).await.map_err(storage_err)?;
        rows.into_iter().map(|r| deserialize_record(r.get::<String, _>("data"))).collect()
    }

    async fn clear_all(&self) -> Result<(), UploadError> {
        sqlx::query("DELETE FROM progress_records").execute(&self.pool).await.map_err(storage_err)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), UploadError> {
        self.pool.close().await;
        Ok(())
    }
}

fn deserialize_record(data: String) -> Result<UploadRecord, UploadError> {
    serde_json::from_str(&data).map_err(UploadError::from)
}

fn storage_err(e: sqlx::Error) -> UploadError {
    UploadError::StorageUnavailable(e.to_string())
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

    #[tokio::test]
    async fn round_trips_a_record() {
        let store = SqliteProgressStore::connect("sqlite::memory:").await.unwrap();
        store.init().await.unwrap();

        let record = UploadRecord::new("task-1", FileInfo::new("a.bin", 10, "application/octet-stream", 0).unwrap(), "tok", 0);
        store.save_record(&record).await.unwrap();

        let fetched = store.get_record("task-1").await.unwrap().unwrap();
        assert_eq!(fetched.task_id(), "task-1");
    }

    #[tokio::test]
    async fn update_unknown_record_is_not_found() {
        let store = SqliteProgressStore::connect("sqlite::memory:").await.unwrap();
        store.init().await.unwrap();
        let err = store.update_record("missing", UploadRecordPatch::default()).await.unwrap_err();
        assert!(matches!(err, UploadError::NotFound(_)));
    }
}
