use std::sync::Arc;

use thiserror::Error;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingService, OpenAiCompatEmbeddings};
use crate::ingest::{DocumentStore, IngestionService, PlainTextExtractor};
use crate::llm::{LlmService, OpenAiCompatChat};
use crate::rag::{AnswerGenerator, RagService, RetrievalEngine};
use crate::store::{SqliteVectorStore, VectorStore};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("failed to load configuration: {0}")]
    Config(ApiError),
    #[error("failed to open document registry: {0}")]
    Documents(ApiError),
    #[error("failed to open vector store: {0}")]
    VectorStore(ApiError),
    #[error("failed to build provider clients: {0}")]
    Providers(ApiError),
}

/// Global application state shared across routes and background tasks.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub ingestion: IngestionService,
    pub rag: RagService,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::load(&paths).map_err(InitializationError::Config)?;

        let documents = DocumentStore::new(paths.documents_db_path.clone())
            .await
            .map_err(InitializationError::Documents)?;
        let vector_store: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::new(paths.vectors_db_path.clone())
                .await
                .map_err(InitializationError::VectorStore)?,
        );

        let embeddings = EmbeddingService::new(
            Arc::new(
                OpenAiCompatEmbeddings::new(&settings.embedding)
                    .map_err(InitializationError::Providers)?,
            ),
            &settings.embedding,
        );
        let llm = LlmService::new(
            Arc::new(OpenAiCompatChat::new(&settings.llm).map_err(InitializationError::Providers)?),
            &settings.llm,
        );

        let ingestion = IngestionService::new(
            documents,
            vector_store.clone(),
            embeddings.clone(),
            Arc::new(PlainTextExtractor),
            settings.chunking.clone(),
        );
        let retrieval =
            RetrievalEngine::new(vector_store, embeddings, settings.retrieval.clone());
        let rag = RagService::new(retrieval, AnswerGenerator::new(llm));

        Ok(Arc::new(AppState {
            paths,
            settings,
            ingestion,
            rag,
        }))
    }
}
