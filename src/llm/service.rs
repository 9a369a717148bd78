//! Retry and default-parameter wrapper around an [`LlmProvider`].

use std::sync::Arc;

use tokio::sync::mpsc;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::config::LlmSettings;
use crate::core::errors::{ApiError, ProviderError};
use crate::core::retry::{with_retry, RetryPolicy};

#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    temperature: f64,
    max_tokens: Option<i32>,
    retry: RetryPolicy,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            retry: RetryPolicy::with_max_retries(settings.max_retries),
        }
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        let mut request = ChatRequest::new(messages);
        request.temperature = Some(self.temperature);
        request.max_tokens = self.max_tokens;
        request
    }

    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, ApiError> {
        let request = self.request(messages);
        with_retry(&self.retry, "llm", || self.provider.complete(request.clone())).await
    }

    /// Opens a token stream. Only the opening call is retried; once tokens
    /// are flowing, a provider failure is delivered in-band through the
    /// channel so the consumer can tell an interrupted stream from a
    /// completed one.
    pub async fn stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<String, ProviderError>>, ApiError> {
        let request = self.request(messages);
        with_retry(&self.retry, "llm", || self.provider.stream(request.clone())).await
    }
}
