//! SQLite-backed vector store.
//!
//! Embeddings are stored as little-endian `f32` BLOBs and searched with a
//! brute-force cosine scan, which is plenty for a manual corpus. Parent
//! and child tables are linked with `ON DELETE CASCADE` so a parent never
//! outlives its document and a child never outlives its parent.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{ChildHit, ChildRecord, ParentRecord, VectorStore};
use crate::core::errors::ApiError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS parent_chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                document_name TEXT NOT NULL,
                content TEXT NOT NULL,
                seq_index INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_parent_document ON parent_chunks(document_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS child_chunks (
                id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL REFERENCES parent_chunks(id) ON DELETE CASCADE,
                document_id TEXT NOT NULL,
                content TEXT NOT NULL,
                seq_index INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_child_parent ON child_chunks(parent_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_child_document ON child_chunks(document_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_parent(row: &sqlx::sqlite::SqliteRow) -> ParentRecord {
        ParentRecord {
            id: row.get("id"),
            document_id: row.get("document_id"),
            document_name: row.get("document_name"),
            content: row.get("content"),
            seq_index: row.get("seq_index"),
            ordinal: row.get("ordinal"),
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert_parent(&self, parent: &ParentRecord) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT OR REPLACE INTO parent_chunks (id, document_id, document_name, content, seq_index)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&parent.id)
        .bind(&parent.document_id)
        .bind(&parent.document_name)
        .bind(&parent.content)
        .bind(parent.seq_index)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn upsert_children(&self, children: &[ChildRecord]) -> Result<(), ApiError> {
        if children.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for child in children {
            let blob = Self::serialize_embedding(&child.embedding);

            sqlx::query(
                "INSERT OR REPLACE INTO child_chunks (id, parent_id, document_id, content, seq_index, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&child.id)
            .bind(&child.parent_id)
            .bind(&child.document_id)
            .bind(&child.content)
            .bind(child.seq_index)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search_children(
        &self,
        query: &[f32],
        limit: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<ChildHit>, ApiError> {
        let rows = if let Some(document_id) = document_id {
            sqlx::query(
                "SELECT id, parent_id, document_id, embedding
                 FROM child_chunks
                 WHERE document_id = ?1",
            )
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?
        } else {
            sqlx::query("SELECT id, parent_id, document_id, embedding FROM child_chunks")
                .fetch_all(&self.pool)
                .await
                .map_err(ApiError::internal)?
        };

        let mut scored: Vec<ChildHit> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query, &stored);

                Some(ChildHit {
                    child_id: row.get("id"),
                    parent_id: row.get("parent_id"),
                    document_id: row.get("document_id"),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn get_parents(&self, parent_ids: &[String]) -> Result<Vec<ParentRecord>, ApiError> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; parent_ids.len()].join(", ");
        let sql = format!(
            "SELECT rowid AS ordinal, id, document_id, document_name, content, seq_index
             FROM parent_chunks
             WHERE id IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql);
        for id in parent_ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(rows.iter().map(Self::row_to_parent).collect())
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM parent_chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() as usize)
    }

    async fn count_children(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM child_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}
