//! Retrieval-augmented answering backend for product manuals.
//!
//! Documents are ingested into a two-level chunk hierarchy (large parents
//! for context, small embedded children for search), retrieval resolves
//! child hits back to deduplicated parents, and answers are generated —
//! streamed or complete — with citations to the source documents.

pub mod chunking;
pub mod core;
pub mod embedding;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod store;
