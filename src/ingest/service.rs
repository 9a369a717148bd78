//! Ingestion orchestrator.
//!
//! Coordinates extraction -> chunking -> embedding -> persistence for one
//! uploaded document. `submit` returns as soon as the document row exists;
//! the pipeline runs as a detached task and the caller polls status.

use std::sync::Arc;

use super::documents::{DocumentRecord, DocumentStore};
use super::extract::TextExtractor;
use crate::chunking::chunk_document;
use crate::core::config::ChunkingSettings;
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingService;
use crate::store::{ChildRecord, ParentRecord, VectorStore};

#[derive(Clone)]
pub struct IngestionService {
    documents: DocumentStore,
    store: Arc<dyn VectorStore>,
    embeddings: EmbeddingService,
    extractor: Arc<dyn TextExtractor>,
    chunking: ChunkingSettings,
}

impl IngestionService {
    pub fn new(
        documents: DocumentStore,
        store: Arc<dyn VectorStore>,
        embeddings: EmbeddingService,
        extractor: Arc<dyn TextExtractor>,
        chunking: ChunkingSettings,
    ) -> Self {
        Self {
            documents,
            store,
            embeddings,
            extractor,
            chunking,
        }
    }

    /// Accepts an upload, creates the document row in `pending`, and spawns
    /// the processing pipeline. Returns immediately; the caller observes
    /// progress through [`IngestionService::status`].
    pub async fn submit(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<DocumentRecord, ApiError> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(ApiError::invalid_input("filename must not be empty"));
        }
        if bytes.is_empty() {
            return Err(ApiError::invalid_input("document body must not be empty"));
        }
        if !self.extractor.supports(filename) {
            return Err(ApiError::invalid_input(format!(
                "unsupported file format: {filename}"
            )));
        }

        let document = self.documents.create(filename).await?;
        tracing::info!("accepted document {} ({})", document.id, filename);

        let service = self.clone();
        let doc_id = document.id.clone();
        let doc_name = document.filename.clone();
        tokio::spawn(async move {
            if let Err(err) = service.process(&doc_id, &doc_name, &bytes).await {
                tracing::error!("ingestion failed for document {}: {}", doc_id, err);
                if let Err(mark_err) = service
                    .documents
                    .mark_failed(&doc_id, &err.to_string())
                    .await
                {
                    tracing::error!(
                        "could not record ingestion failure for {}: {}",
                        doc_id,
                        mark_err
                    );
                }
            }
        });

        Ok(document)
    }

    async fn process(
        &self,
        document_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), ApiError> {
        self.documents.mark_processing(document_id).await?;

        let text = self
            .extractor
            .extract(bytes, filename)
            .map_err(ApiError::invalid_input)?;

        let parents = chunk_document(document_id, &text, &self.chunking);
        if parents.is_empty() {
            return Err(ApiError::invalid_input(
                "document contains no extractable text",
            ));
        }

        let mut child_total: i64 = 0;
        for parent in &parents {
            let texts: Vec<String> = parent
                .children
                .iter()
                .map(|child| child.content.clone())
                .collect();
            let vectors = self.embeddings.embed(&texts).await?;

            self.store
                .upsert_parent(&ParentRecord {
                    id: parent.id.clone(),
                    document_id: document_id.to_string(),
                    document_name: filename.to_string(),
                    content: parent.content.clone(),
                    seq_index: parent.seq_index as i64,
                    ordinal: 0,
                })
                .await?;

            let children: Vec<ChildRecord> = parent
                .children
                .iter()
                .zip(vectors)
                .map(|(child, embedding)| ChildRecord {
                    id: child.id.clone(),
                    parent_id: child.parent_id.clone(),
                    document_id: document_id.to_string(),
                    content: child.content.clone(),
                    seq_index: child.seq_index as i64,
                    embedding,
                })
                .collect();
            self.store.upsert_children(&children).await?;

            child_total += children.len() as i64;
        }

        self.documents
            .mark_ready(document_id, parents.len() as i64, child_total)
            .await?;
        tracing::info!(
            "document {} ready: {} parent chunks, {} child chunks",
            document_id,
            parents.len(),
            child_total
        );

        Ok(())
    }

    pub async fn status(&self, document_id: &str) -> Result<DocumentRecord, ApiError> {
        self.documents
            .get(document_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("document {document_id}")))
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ApiError> {
        self.documents.list().await
    }

    /// Removes a document and every chunk derived from it.
    pub async fn delete_document(&self, document_id: &str) -> Result<(), ApiError> {
        if self.documents.get(document_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("document {document_id}")));
        }

        self.store.delete_document(document_id).await?;
        self.documents.delete(document_id).await?;
        tracing::info!("deleted document {}", document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::core::config::EmbeddingSettings;
    use crate::core::errors::ProviderError;
    use crate::embedding::EmbeddingProvider;
    use crate::ingest::extract::PlainTextExtractor;
    use crate::ingest::DocumentStatus;
    use crate::store::SqliteVectorStore;

    struct FakeEmbeddings {
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbeddings {
        fn name(&self) -> &str {
            "fake"
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            if self.fail {
                return Err(ProviderError::permanent("embedding backend offline"));
            }
            Ok(inputs
                .iter()
                .map(|text| vec![text.len() as f32, 1.0, 0.0])
                .collect())
        }
    }

    async fn service(fail_embeddings: bool) -> IngestionService {
        let dir = std::env::temp_dir();
        let suffix = uuid::Uuid::new_v4();
        let documents = DocumentStore::new(dir.join(format!("manualbot-ingest-docs-{suffix}.db")))
            .await
            .unwrap();
        let store = Arc::new(
            SqliteVectorStore::new(dir.join(format!("manualbot-ingest-vec-{suffix}.db")))
                .await
                .unwrap(),
        );
        let embeddings = EmbeddingService::new(
            Arc::new(FakeEmbeddings {
                fail: fail_embeddings,
            }),
            &EmbeddingSettings {
                dimension: 3,
                max_retries: 0,
                ..EmbeddingSettings::default()
            },
        );

        IngestionService::new(
            documents,
            store,
            embeddings,
            Arc::new(PlainTextExtractor),
            ChunkingSettings::default(),
        )
    }

    async fn wait_terminal(service: &IngestionService, id: &str) -> DocumentRecord {
        for _ in 0..200 {
            let record = service.status(id).await.unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("document {id} never reached a terminal status");
    }

    #[tokio::test]
    async fn upload_returns_pending_then_becomes_ready() {
        let service = service(false).await;
        let text = "The dishwasher filter should be rinsed monthly. ".repeat(60);

        let doc = service
            .submit(text.into_bytes(), "dishwasher.txt")
            .await
            .unwrap();
        assert_eq!(doc.status, DocumentStatus::Pending);

        let finished = wait_terminal(&service, &doc.id).await;
        assert_eq!(finished.status, DocumentStatus::Ready);
        assert!(finished.parent_chunks.unwrap() >= 1);
        assert!(finished.child_chunks.unwrap() >= finished.parent_chunks.unwrap());
        assert_eq!(
            service.store.count_children().await.unwrap() as i64,
            finished.child_chunks.unwrap()
        );
    }

    #[tokio::test]
    async fn provider_failure_marks_document_failed() {
        let service = service(true).await;

        let doc = service
            .submit(b"Short manual text.".to_vec(), "manual.txt")
            .await
            .unwrap();

        let finished = wait_terminal(&service, &doc.id).await;
        assert_eq!(finished.status, DocumentStatus::Failed);
        assert!(finished.error.unwrap().contains("embedding"));
    }

    #[tokio::test]
    async fn rejects_empty_and_unsupported_uploads() {
        let service = service(false).await;

        let err = service.submit(Vec::new(), "manual.txt").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = service
            .submit(b"%PDF-1.7".to_vec(), "manual.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = service.submit(b"text".to_vec(), "   ").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_document_removes_chunks_and_registry_row() {
        let service = service(false).await;
        let text = "Replace the vacuum belt when it squeals. ".repeat(80);

        let doc = service.submit(text.into_bytes(), "vacuum.txt").await.unwrap();
        wait_terminal(&service, &doc.id).await;
        assert!(service.store.count_children().await.unwrap() > 0);

        service.delete_document(&doc.id).await.unwrap();
        assert_eq!(service.store.count_children().await.unwrap(), 0);
        assert!(matches!(
            service.status(&doc.id).await,
            Err(ApiError::NotFound(_))
        ));

        assert!(matches!(
            service.delete_document(&doc.id).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
