//! Parent-document retrieval.
//!
//! Child chunks are the unit of similarity search; parents are the unit of
//! context. A query is embedded, oversampled child hits are resolved to
//! their parents, parents are deduplicated keeping each one's best child
//! score, and the top k parents are assembled into an ordered context
//! bundle.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::RetrievalSettings;
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingService;
use crate::store::{ParentRecord, VectorStore};

/// One parent chunk selected for a query, ranked by its best child score.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub parent: ParentRecord,
    pub score: f32,
}

/// The ranked, deduplicated context bundle for one query. Ephemeral;
/// rebuilt per query, never persisted.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub entries: Vec<ContextEntry>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Clone)]
pub struct RetrievalEngine {
    store: Arc<dyn VectorStore>,
    embeddings: EmbeddingService,
    config: RetrievalSettings,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embeddings: EmbeddingService,
        config: RetrievalSettings,
    ) -> Self {
        Self {
            store,
            embeddings,
            config,
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext, ApiError> {
        self.retrieve_top_k(query, self.config.top_k).await
    }

    /// Retrieves the top `k` parent chunks for `query`.
    ///
    /// Searches `k * candidate_multiplier` child chunks so that several
    /// hits collapsing into one parent still leave enough distinct parents.
    /// An empty result is a valid outcome, not an error; the generator
    /// handles it explicitly.
    pub async fn retrieve_top_k(&self, query: &str, k: usize) -> Result<RetrievedContext, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::invalid_input("query must not be empty"));
        }
        let k = k.max(1);

        let query_vector = self.embeddings.embed_one(query).await?;
        let candidate_limit = k.saturating_mul(self.config.candidate_multiplier.max(1));
        let hits = self
            .store
            .search_children(&query_vector, candidate_limit, None)
            .await?;

        // Deduplicate parents, keeping the best child score for each.
        let mut best_scores: HashMap<String, f32> = HashMap::new();
        for hit in hits {
            if hit.score <= 0.0 {
                continue;
            }
            let entry = best_scores.entry(hit.parent_id).or_insert(hit.score);
            if hit.score > *entry {
                *entry = hit.score;
            }
        }

        if best_scores.is_empty() {
            return Ok(RetrievedContext::default());
        }

        let parent_ids: Vec<String> = best_scores.keys().cloned().collect();
        let parents = self.store.get_parents(&parent_ids).await?;

        let mut entries: Vec<ContextEntry> = parents
            .into_iter()
            .filter_map(|parent| {
                best_scores.get(&parent.id).map(|&score| ContextEntry { parent, score })
            })
            .collect();

        // Rank by score; equal scores fall back to store order, which is
        // earlier-document-then-earlier-parent.
        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.parent.ordinal.cmp(&b.parent.ordinal))
        });
        entries.truncate(k);

        // Keep score order across documents but restore document order
        // within one: a manual read in sequence makes a better context.
        let mut document_rank: HashMap<String, usize> = HashMap::new();
        for entry in &entries {
            let next = document_rank.len();
            document_rank
                .entry(entry.parent.document_id.clone())
                .or_insert(next);
        }
        entries.sort_by(|a, b| {
            document_rank[&a.parent.document_id]
                .cmp(&document_rank[&b.parent.document_id])
                .then(a.parent.seq_index.cmp(&b.parent.seq_index))
        });

        Ok(RetrievedContext { entries })
    }
}
