//! Document registry.
//!
//! One row per uploaded document, tracking the ingestion state machine
//! `pending -> processing -> ready | failed`. Rows are never mutated after
//! reaching `ready` or `failed`; re-uploading a file creates a new row.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DocumentStatus::Pending),
            "processing" => Some(DocumentStatus::Processing),
            "ready" => Some(DocumentStatus::Ready),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Ready | DocumentStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    pub status: DocumentStatus,
    pub error: Option<String>,
    pub parent_chunks: Option<i64>,
    pub child_chunks: Option<i64>,
    pub created_at: String,
}

#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                error TEXT,
                parent_chunks INTEGER,
                child_chunks INTEGER,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(Self { pool })
    }

    pub async fn create(&self, filename: &str) -> Result<DocumentRecord, ApiError> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO documents (id, filename, status, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(filename)
            .bind(DocumentStatus::Pending.as_str())
            .bind(&created_at)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(DocumentRecord {
            id,
            filename: filename.to_string(),
            status: DocumentStatus::Pending,
            error: None,
            parent_chunks: None,
            child_chunks: None,
            created_at,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<DocumentRecord>, ApiError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        row.as_ref().map(row_to_record).transpose()
    }

    pub async fn list(&self) -> Result<Vec<DocumentRecord>, ApiError> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        rows.iter().map(row_to_record).collect()
    }

    pub async fn mark_processing(&self, id: &str) -> Result<(), ApiError> {
        self.set_status(id, DocumentStatus::Processing).await
    }

    pub async fn mark_ready(
        &self,
        id: &str,
        parent_chunks: i64,
        child_chunks: i64,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE documents SET status = ?, parent_chunks = ?, child_chunks = ?, error = NULL
             WHERE id = ?",
        )
        .bind(DocumentStatus::Ready.as_str())
        .bind(parent_chunks)
        .bind(child_chunks)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE documents SET status = ?, error = ? WHERE id = ?")
            .bind(DocumentStatus::Failed.as_str())
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_status(&self, id: &str, status: DocumentStatus) -> Result<(), ApiError> {
        sqlx::query("UPDATE documents SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentRecord, ApiError> {
    let status_str: String = row.get("status");
    let status = DocumentStatus::parse(&status_str)
        .ok_or_else(|| ApiError::internal(format!("unknown document status: {status_str}")))?;

    Ok(DocumentRecord {
        id: row.get("id"),
        filename: row.get("filename"),
        status,
        error: row.get("error"),
        parent_chunks: row.get("parent_chunks"),
        child_chunks: row.get("child_chunks"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> DocumentStore {
        let tmp = std::env::temp_dir().join(format!(
            "manualbot-documents-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        DocumentStore::new(tmp).await.unwrap()
    }

    #[tokio::test]
    async fn create_starts_pending() {
        let store = test_store().await;
        let doc = store.create("manual.txt").await.unwrap();

        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(doc.error.is_none());

        let fetched = store.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.filename, "manual.txt");
        assert_eq!(fetched.status, DocumentStatus::Pending);
    }

    #[tokio::test]
    async fn status_transitions_to_ready_with_counts() {
        let store = test_store().await;
        let doc = store.create("manual.txt").await.unwrap();

        store.mark_processing(&doc.id).await.unwrap();
        let fetched = store.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Processing);

        store.mark_ready(&doc.id, 3, 24).await.unwrap();
        let fetched = store.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Ready);
        assert!(fetched.status.is_terminal());
        assert_eq!(fetched.parent_chunks, Some(3));
        assert_eq!(fetched.child_chunks, Some(24));
    }

    #[tokio::test]
    async fn failure_records_the_error() {
        let store = test_store().await;
        let doc = store.create("manual.txt").await.unwrap();

        store
            .mark_failed(&doc.id, "embedding provider unavailable")
            .await
            .unwrap();

        let fetched = store.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Failed);
        assert_eq!(
            fetched.error.as_deref(),
            Some("embedding provider unavailable")
        );
    }

    #[tokio::test]
    async fn reupload_creates_a_new_document() {
        let store = test_store().await;
        let first = store.create("manual.txt").await.unwrap();
        let second = store.create("manual.txt").await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = test_store().await;
        let doc = store.create("manual.txt").await.unwrap();

        assert!(store.delete(&doc.id).await.unwrap());
        assert!(!store.delete(&doc.id).await.unwrap());
        assert!(store.get(&doc.id).await.unwrap().is_none());
    }
}
