use async_trait::async_trait;

use crate::core::errors::ProviderError;

/// Black-box vector generator. One vector per input text, in input order,
/// with a provider-fixed dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}
