//! SQLite-backed `MetadataStore`. Manifests are persisted as a JSON blob
//! alongside indexed `file_id`/`status`/`file_hash` columns so
//! `find_completed_manifest_by_file_hash` can be a plain indexed query
//! rather than a full scan-and-deserialize.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use upload_domain::services::metadata_store::{MetadataStore, TokenBinding};
use upload_domain::value_objects::manifest::{Manifest, ManifestStatus};
use upload_domain::UploadError;

pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub async fn connect(database_url: &str) -> Result<Self, UploadError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| UploadError::StorageUnavailable(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn init(&self) -> Result<(), UploadError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS manifests (
                file_id    TEXT PRIMARY KEY,
                status     TEXT NOT NULL,
                file_hash  TEXT,
                data       TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS upload_tokens (
                token      TEXT PRIMARY KEY,
                file_id    TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_manifests_file_hash ON manifests(file_hash) WHERE status = 'completed'")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }

    async fn put_manifest(&self, manifest: &Manifest) -> Result<(), UploadError> {
        self.upsert_manifest(manifest).await
    }

    async fn get_manifest(&self, file_id: &str) -> Result<Option<Manifest>, UploadError> {
        let row = sqlx::query("SELECT data FROM manifests WHERE file_id = ?1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| deserialize_manifest(r.get::<String, _>("data"))).transpose()
    }

    async fn update_manifest(&self, manifest: &Manifest) -> Result<(), UploadError> {
        self.upsert_manifest(manifest).await
    }

    async fn find_completed_manifest_by_file_hash(&self, file_hash: &str) -> Result<Option<Manifest>, UploadError> {
        let row = sqlx::query("SELECT data FROM manifests WHERE status = 'completed' AND file_hash = ?1 LIMIT 1")
            .bind(file_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| deserialize_manifest(r.get::<String, _>("data"))).transpose()
    }

    async fn delete_manifest(&self, file_id: &str) -> Result<(), UploadError> {
        sqlx::query("DELETE FROM manifests WHERE file_id = ?1")
            .bind(file_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn put_token(&self, token: &str, binding: TokenBinding) -> Result<(), UploadError> {
        sqlx::query("INSERT OR REPLACE INTO upload_tokens (token, file_id, expires_at) VALUES (?1, ?2, ?3)")
            .bind(token)
            .bind(&binding.file_id)
            .bind(binding.expires_at)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<TokenBinding>, UploadError> {
        let row = sqlx::query("SELECT file_id, expires_at FROM upload_tokens WHERE token = ?1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(|r| TokenBinding {
            file_id: r.get("file_id"),
            expires_at: r.get("expires_at"),
        }))
    }
}

impl SqliteMetadataStore {
    async fn upsert_manifest(&self, manifest: &Manifest) -> Result<(), UploadError> {
        let status = match manifest.status() {
            ManifestStatus::Pending => "pending",
            ManifestStatus::Completed => "completed",
        };
        let data = serde_json::to_string(manifest)?;
        sqlx::query("INSERT OR REPLACE INTO manifests (file_id, status, file_hash, data) VALUES (?1, ?2, ?3, ?4)")
            .bind(manifest.file_id())
            .bind(status)
            .bind(manifest.file_hash().map(|h| h.as_str()))
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

fn deserialize_manifest(data: String) -> Result<Manifest, UploadError> {
    serde_json::from_str(&data).map_err(UploadError::from)
}

fn storage_err(e: sqlx::Error) -> UploadError {
    UploadError::StorageUnavailable(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_pending_manifest() {
        let store = SqliteMetadataStore::connect("sqlite::memory:").await.unwrap();
        store.init().await.unwrap();

        let manifest = Manifest::new_pending("file-1", 2, 200, "text/plain", 0);
        store.put_manifest(&manifest).await.unwrap();

        let fetched = store.get_manifest("file-1").await.unwrap().unwrap();
        assert_eq!(fetched.file_id(), "file-1");
        assert_eq!(fetched.chunk_count(), 2);
    }

    #[tokio::test]
    async fn token_round_trips() {
        let store = SqliteMetadataStore::connect("sqlite::memory:").await.unwrap();
        store.init().await.unwrap();

        store
            .put_token("tok-1", TokenBinding { file_id: "file-1".into(), expires_at: 12345 })
            .await
            .unwrap();
        let binding = store.get_token("tok-1").await.unwrap().unwrap();
        assert_eq!(binding.file_id, "file-1");
        assert_eq!(binding.expires_at, 12345);
    }
}
