//! Batching and retry policy around an [`EmbeddingProvider`].
//!
//! Results are never cached: repeated text is legal and re-embedded.

use std::sync::Arc;

use super::provider::EmbeddingProvider;
use crate::core::config::EmbeddingSettings;
use crate::core::errors::ApiError;
use crate::core::retry::{with_retry, RetryPolicy};

#[derive(Clone)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    max_batch_size: usize,
    retry: RetryPolicy,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, settings: &EmbeddingSettings) -> Self {
        Self {
            provider,
            dimension: settings.dimension,
            max_batch_size: settings.max_batch_size.max(1),
            retry: RetryPolicy::with_max_retries(settings.max_retries),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embeds every text, batching up to the provider's maximum batch size.
    /// Returns one vector per input, in input order. Transient provider
    /// failures are retried per batch; exhaustion surfaces as
    /// [`ApiError::ProviderUnavailable`].
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch_size) {
            let batch_vectors =
                with_retry(&self.retry, "embedding", || self.provider.embed(batch)).await?;

            if batch_vectors.len() != batch.len() {
                return Err(ApiError::internal(format!(
                    "embedding provider returned {} vectors for {} inputs",
                    batch_vectors.len(),
                    batch.len()
                )));
            }
            for vector in &batch_vectors {
                if vector.len() != self.dimension {
                    return Err(ApiError::internal(format!(
                        "embedding dimension mismatch: expected {}, got {}",
                        self.dimension,
                        vector.len()
                    )));
                }
            }

            vectors.extend(batch_vectors);
        }

        Ok(vectors)
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let inputs = [text.to_string()];
        let mut vectors = self.embed(&inputs).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::internal("embedding provider returned no vector"))
    }
}
