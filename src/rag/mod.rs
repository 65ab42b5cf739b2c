//! Retrieval engine.
//!
//! This module provides:
//! - `SemanticChunker`: splits content into bounded, structure-aware chunks
//! - `VectorCache`: short-lived namespace and document vector cache
//! - `HybridRetriever`: merges cache and persistent-store matches
//! - `RagContextService`: question in, grounding context out
//! - `IngestionPipeline`: chunk, embed, persist and cache tenant content

mod cache;
mod chunker;
mod context;
mod embedding;
mod ingest;
mod namespace;
mod retriever;
mod sqlite;
mod store;
mod types;

pub use cache::{AggregateStatus, CacheKey, CacheStatus, EntryStatus, VectorCache};
pub use chunker::{is_special, SemanticChunker};
pub use context::{ContextProvider, RagContextService};
pub use embedding::{EmbeddingProvider, OpenAiEmbeddingProvider};
pub use ingest::{IngestReport, IngestionPipeline};
pub use namespace::namespace_for_url;
pub use retriever::{HybridRetriever, RetrievalMode, RetrievalOutcome};
pub use sqlite::SqliteVectorStore;
pub use store::{DeleteScope, IndexStats, PersistentVectorStore, VectorMetadata, VectorRecord};
pub use types::{sort_matches, Chunk, EmbeddingVector, MatchSource, RetrievalMatch};
