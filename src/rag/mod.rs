//! Retrieval-augmented answering: retrieval engine, prompt assembly, and
//! answer generation, joined by [`RagService`].

pub mod answer;
pub mod prompt;
pub mod retrieval;

use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;

pub use answer::{AnswerEvent, AnswerGenerator, AnswerRecord, SourceCitation};
pub use retrieval::{ContextEntry, RetrievalEngine, RetrievedContext};

/// Questions longer than this are rejected before any provider call.
const MAX_QUERY_CHARS: usize = 1000;

#[derive(Clone)]
pub struct RagService {
    retrieval: RetrievalEngine,
    generator: AnswerGenerator,
}

impl RagService {
    pub fn new(retrieval: RetrievalEngine, generator: AnswerGenerator) -> Self {
        Self {
            retrieval,
            generator,
        }
    }

    fn validate_query(query: &str) -> Result<&str, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::invalid_input("query must not be empty"));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(ApiError::invalid_input(format!(
                "query exceeds {MAX_QUERY_CHARS} characters"
            )));
        }
        Ok(query)
    }

    /// Answers a question in one shot: retrieve, then generate.
    pub async fn ask(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<AnswerRecord, ApiError> {
        let query = Self::validate_query(query)?;
        let context = self.retrieval.retrieve(query).await?;
        self.generator.generate(query, &context, history).await
    }

    /// Streaming variant of [`RagService::ask`].
    pub async fn ask_stream(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<mpsc::Receiver<AnswerEvent>, ApiError> {
        let query = Self::validate_query(query)?;
        let context = self.retrieval.retrieve(query).await?;
        self.generator.generate_stream(query, &context, history).await
    }
}
