//! Content ingestion: chunk, embed, persist, then warm the cache.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::cache::{CacheKey, VectorCache};
use super::chunker::SemanticChunker;
use super::embedding::EmbeddingProvider;
use super::store::{DeleteScope, PersistentVectorStore, VectorMetadata, VectorRecord};
use super::types::{Chunk, EmbeddingVector};
use crate::core::config::{CacheSettings, StoreSettings};
use crate::core::errors::RagError;

const UPLOADED_DOC_TYPE: &str = "uploaded";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_name: Option<String>,
    pub chunk_count: usize,
    /// Vectors deleted before the write.
    pub replaced: usize,
}

impl IngestReport {
    fn empty(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            doc_id: None,
            doc_name: None,
            chunk_count: 0,
            replaced: 0,
        }
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    chunker: SemanticChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn PersistentVectorStore>,
    cache: Arc<VectorCache>,
    namespace_ttl: Duration,
    document_ttl: Duration,
    batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        chunker: SemanticChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn PersistentVectorStore>,
        cache: Arc<VectorCache>,
        cache_settings: &CacheSettings,
        store_settings: &StoreSettings,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            cache,
            namespace_ttl: cache_settings.namespace_ttl(),
            document_ttl: cache_settings.document_ttl(),
            batch_size: store_settings.upsert_batch_size.max(1),
        }
    }

    /// Replaces all of a namespace's vectors with the chunks of `text`.
    pub async fn ingest_namespace(&self, namespace: &str, text: &str) -> Result<IngestReport, RagError> {
        require_namespace(namespace)?;
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Ok(IngestReport::empty(namespace));
        }
        let vectors = self.embed_chunks(&chunks).await?;

        let existing = self.store.describe_stats(Some(namespace)).await?.count(namespace);
        let replaced = if existing > 0 {
            self.store.delete(namespace, DeleteScope::All).await?
        } else {
            0
        };

        let records = chunks
            .iter()
            .zip(&vectors)
            .map(|(chunk, vector)| VectorRecord {
                id: format!("{}-{}", namespace, chunk.index),
                vector: vector.clone(),
                metadata: VectorMetadata::text(chunk.text.clone()),
            })
            .collect();
        self.write_batches(namespace, records).await?;

        let chunk_count = chunks.len();
        self.cache.put(
            CacheKey::namespace(namespace),
            vectors,
            chunks,
            self.namespace_ttl,
        )?;

        tracing::info!(
            "Ingested {} chunks into namespace '{}' (replaced {})",
            chunk_count,
            namespace,
            replaced
        );
        Ok(IngestReport {
            chunk_count,
            replaced,
            ..IngestReport::empty(namespace)
        })
    }

    /// Adds an uploaded document under a fresh `doc_id`.
    pub async fn ingest_document(
        &self,
        namespace: &str,
        doc_name: &str,
        text: &str,
    ) -> Result<IngestReport, RagError> {
        require_namespace(namespace)?;
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Ok(IngestReport::empty(namespace));
        }
        let vectors = self.embed_chunks(&chunks).await?;
        let doc_id = uuid::Uuid::new_v4().to_string();

        let records = chunks
            .iter()
            .zip(&vectors)
            .map(|(chunk, vector)| VectorRecord {
                id: format!("{}-{}-{}", namespace, doc_id, chunk.index),
                vector: vector.clone(),
                metadata: VectorMetadata {
                    text: chunk.text.clone(),
                    doc_id: Some(doc_id.clone()),
                    doc_type: Some(UPLOADED_DOC_TYPE.to_string()),
                    chunk_index: Some(chunk.index),
                },
            })
            .collect();
        self.write_batches(namespace, records).await?;

        let chunk_count = chunks.len();
        self.cache
            .put_document(namespace, &doc_id, vectors, chunks, self.document_ttl)?;

        tracing::info!(
            "Ingested document '{}' ({}) into '{}': {} chunks",
            doc_name,
            doc_id,
            namespace,
            chunk_count
        );
        Ok(IngestReport {
            doc_id: Some(doc_id),
            doc_name: Some(doc_name.to_string()),
            chunk_count,
            ..IngestReport::empty(namespace)
        })
    }

    /// Removes a document from the store and the cache.
    /// Returns the number of stored vectors removed.
    pub async fn delete_document(&self, namespace: &str, doc_id: &str) -> Result<usize, RagError> {
        let removed = self
            .store
            .delete(namespace, DeleteScope::Document(doc_id.to_string()))
            .await?;
        let was_cached = self.cache.delete_document(namespace, doc_id);

        if removed == 0 && !was_cached {
            return Err(RagError::NotFound(format!(
                "document '{}' in namespace '{}'",
                doc_id, namespace
            )));
        }

        tracing::info!(
            "Deleted document '{}' from '{}' ({} vectors)",
            doc_id,
            namespace,
            removed
        );
        Ok(removed)
    }

    /// Whether the persistent store holds any vectors for `namespace`.
    pub async fn namespace_ready(&self, namespace: &str) -> Result<bool, RagError> {
        let stats = self.store.describe_stats(Some(namespace)).await?;
        Ok(stats.count(namespace) > 0)
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddingVector>, RagError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::Provider(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    async fn write_batches(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), RagError> {
        for batch in records.chunks(self.batch_size) {
            self.store.upsert_batch(namespace, batch.to_vec()).await?;
        }
        Ok(())
    }
}

fn require_namespace(namespace: &str) -> Result<(), RagError> {
    if namespace.trim().is_empty() {
        return Err(RagError::Validation("namespace is empty".to_string()));
    }
    Ok(())
}
