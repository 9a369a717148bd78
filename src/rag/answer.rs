//! Answer generation over a retrieved context bundle.
//!
//! Both modes report which chunks were actually placed in the prompt: the
//! non-streaming path returns them on the record, the streaming path emits
//! them as the first event so a consumer can render sources while tokens
//! are still arriving.

use serde::Serialize;
use tokio::sync::mpsc;

use super::prompt::{build_messages, INSUFFICIENT_CONTEXT_ANSWER};
use super::retrieval::RetrievedContext;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, LlmService};

/// Provenance of one context entry used for an answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCitation {
    pub document_id: String,
    pub document_name: String,
    pub parent_id: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerRecord {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}

/// One event of a streamed answer.
///
/// Order: `Sources` first, then `Token`s in provider arrival order, then
/// exactly one of `Done` (clean completion) or `Error` (interrupted —
/// tokens delivered so far are valid but incomplete).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerEvent {
    Sources { sources: Vec<SourceCitation> },
    Token { content: String },
    Done,
    Error { message: String },
}

pub fn citations(context: &RetrievedContext) -> Vec<SourceCitation> {
    context
        .entries
        .iter()
        .map(|entry| SourceCitation {
            document_id: entry.parent.document_id.clone(),
            document_name: entry.parent.document_name.clone(),
            parent_id: entry.parent.id.clone(),
            similarity: entry.score,
        })
        .collect()
}

#[derive(Clone)]
pub struct AnswerGenerator {
    llm: LlmService,
}

impl AnswerGenerator {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    /// Generates a complete answer. An empty context short-circuits to the
    /// insufficient-information reply without touching the provider.
    pub async fn generate(
        &self,
        query: &str,
        context: &RetrievedContext,
        history: &[ChatMessage],
    ) -> Result<AnswerRecord, ApiError> {
        if context.is_empty() {
            return Ok(AnswerRecord {
                answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let messages = build_messages(query, context, history);
        let answer = self.llm.complete(messages).await?;

        Ok(AnswerRecord {
            answer,
            sources: citations(context),
        })
    }

    /// Opens a token stream for the answer. A provider failure before any
    /// token surfaces as a hard error from this call; a failure mid-stream
    /// becomes the terminal `Error` event. Dropping the returned receiver
    /// stops the upstream provider call.
    pub async fn generate_stream(
        &self,
        query: &str,
        context: &RetrievedContext,
        history: &[ChatMessage],
    ) -> Result<mpsc::Receiver<AnswerEvent>, ApiError> {
        let (tx, rx) = mpsc::channel(32);

        if context.is_empty() {
            tokio::spawn(async move {
                if tx
                    .send(AnswerEvent::Sources {
                        sources: Vec::new(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                if tx
                    .send(AnswerEvent::Token {
                        content: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                let _ = tx.send(AnswerEvent::Done).await;
            });
            return Ok(rx);
        }

        let sources = citations(context);
        let messages = build_messages(query, context, history);
        let mut upstream = self.llm.stream(messages).await?;

        tokio::spawn(async move {
            if tx.send(AnswerEvent::Sources { sources }).await.is_err() {
                return;
            }

            let mut delivered: usize = 0;
            while let Some(item) = upstream.recv().await {
                match item {
                    Ok(token) => {
                        if tx
                            .send(AnswerEvent::Token { content: token })
                            .await
                            .is_err()
                        {
                            // Consumer disconnected; returning drops the
                            // upstream receiver, which stops the provider.
                            return;
                        }
                        delivered += 1;
                    }
                    Err(err) => {
                        tracing::warn!(
                            "generation stream failed after {} tokens: {}",
                            delivered,
                            err
                        );
                        let marker = ApiError::StreamInterrupted(err.to_string());
                        let _ = tx
                            .send(AnswerEvent::Error {
                                message: marker.to_string(),
                            })
                            .await;
                        return;
                    }
                }
            }

            let _ = tx.send(AnswerEvent::Done).await;
        });

        Ok(rx)
    }
}
