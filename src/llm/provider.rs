use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::ChatRequest;
use crate::core::errors::ProviderError;

/// Black-box text generator.
///
/// `stream` delivers tokens through the channel in provider arrival order.
/// When the consumer drops the receiver, the provider task's next send
/// fails and it must stop reading from the upstream connection; no
/// generation continues for a consumer that went away.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Chat completion, awaited to the end.
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError>;

    /// Streaming chat completion. The channel closes after the final token
    /// on clean completion; a mid-stream provider failure is delivered as
    /// a final `Err` item.
    async fn stream(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ProviderError>>, ProviderError>;
}
