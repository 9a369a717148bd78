//! Document ingestion: upload intake, text extraction, and the background
//! chunk/embed/persist pipeline with per-document status tracking.

mod documents;
mod extract;
mod service;

pub use documents::{DocumentRecord, DocumentStatus, DocumentStore};
pub use extract::{ExtractError, PlainTextExtractor, TextExtractor};
pub use service::IngestionService;
