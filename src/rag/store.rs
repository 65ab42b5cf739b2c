//! PersistentVectorStore trait: the durable, namespace-partitioned vector index
//! the retriever falls back to and the ingestion pipeline writes into.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{EmbeddingVector, RetrievalMatch};
use crate::core::errors::RagError;

/// Metadata stored alongside every vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

impl VectorMetadata {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// One vector to write.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: EmbeddingVector,
    pub metadata: VectorMetadata,
}

/// What a delete call removes within one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    All,
    Ids(Vec<String>),
    /// Every vector whose metadata carries this `doc_id`.
    Document(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub namespaces: BTreeMap<String, usize>,
    pub total: usize,
}

impl IndexStats {
    pub fn count(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).copied().unwrap_or(0)
    }
}

#[async_trait]
pub trait PersistentVectorStore: Send + Sync {
    /// Best `top_k` matches in `namespace`, highest score first.
    async fn query(
        &self,
        namespace: &str,
        vector: &EmbeddingVector,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, RagError>;

    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        vector: &EmbeddingVector,
        metadata: VectorMetadata,
    ) -> Result<(), RagError>;

    async fn upsert_batch(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), RagError> {
        for record in records {
            self.upsert(namespace, &record.id, &record.vector, record.metadata)
                .await?;
        }
        Ok(())
    }

    /// Returns the number of vectors removed.
    async fn delete(&self, namespace: &str, scope: DeleteScope) -> Result<usize, RagError>;

    /// Vector counts for one namespace, or for all of them when `None`.
    async fn describe_stats(&self, namespace: Option<&str>) -> Result<IndexStats, RagError>;
}
