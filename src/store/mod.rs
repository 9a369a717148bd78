//! Vector store gateway.
//!
//! The pipeline persists parent chunks (text + metadata) and child chunks
//! (text + embedding vector) behind the [`VectorStore`] trait and searches
//! child vectors by similarity. The bundled implementation is
//! [`SqliteVectorStore`]; an external vector database would implement the
//! same trait.

mod sqlite;

use async_trait::async_trait;

use crate::core::errors::ApiError;

pub use sqlite::SqliteVectorStore;

/// Stored parent chunk.
///
/// `ordinal` is the store's insertion order; it is populated on reads and
/// ignored on writes. Since ingestion writes parents in document order, a
/// lower ordinal means an earlier document, or an earlier chunk within the
/// same document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRecord {
    pub id: String,
    pub document_id: String,
    pub document_name: String,
    pub content: String,
    pub seq_index: i64,
    pub ordinal: i64,
}

/// Stored child chunk with its embedding vector.
#[derive(Debug, Clone)]
pub struct ChildRecord {
    pub id: String,
    pub parent_id: String,
    pub document_id: String,
    pub content: String,
    pub seq_index: i64,
    pub embedding: Vec<f32>,
}

/// One similarity-search hit. Higher score is better.
#[derive(Debug, Clone)]
pub struct ChildHit {
    pub child_id: String,
    pub parent_id: String,
    pub document_id: String,
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert_parent(&self, parent: &ParentRecord) -> Result<(), ApiError>;

    /// Upserts a batch of children in a single transaction.
    async fn upsert_children(&self, children: &[ChildRecord]) -> Result<(), ApiError>;

    /// Returns up to `limit` child hits ranked by cosine similarity,
    /// optionally restricted to one document.
    async fn search_children(
        &self,
        query: &[f32],
        limit: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<ChildHit>, ApiError>;

    async fn get_parents(&self, parent_ids: &[String]) -> Result<Vec<ParentRecord>, ApiError>;

    /// Deletes every chunk belonging to a document. Children cascade with
    /// their parents. Returns the number of parents removed.
    async fn delete_document(&self, document_id: &str) -> Result<usize, ApiError>;

    async fn count_children(&self) -> Result<usize, ApiError>;
}
