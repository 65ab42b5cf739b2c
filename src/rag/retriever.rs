//! Hybrid retrieval over the vector cache and the persistent store.
//!
//! Mode is picked per call:
//! 1. `Hybrid` when the namespace has live document-cache entries. Every document
//!    entry is searched and the persistent store is queried as well.
//! 2. `Cache` when the namespace-level entry is live and yields matches.
//! 3. `Fallback` otherwise: the persistent store alone.
//!
//! Store failures and timeouts are logged and absorbed; a call always returns
//! whatever it gathered.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::cache::{CacheKey, VectorCache};
use super::store::PersistentVectorStore;
use super::types::{sort_matches, EmbeddingVector, RetrievalMatch};
use crate::core::config::defaults::STORE_TIMEOUT_MS;
use crate::core::errors::RagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    Hybrid,
    Cache,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalOutcome {
    pub mode: RetrievalMode,
    pub matches: Vec<RetrievalMatch>,
}

#[derive(Clone)]
pub struct HybridRetriever {
    cache: Arc<VectorCache>,
    store: Arc<dyn PersistentVectorStore>,
    store_timeout: Duration,
}

impl HybridRetriever {
    pub fn new(cache: Arc<VectorCache>, store: Arc<dyn PersistentVectorStore>) -> Self {
        Self {
            cache,
            store,
            store_timeout: Duration::from_millis(STORE_TIMEOUT_MS),
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<VectorCache> {
        &self.cache
    }

    pub async fn retrieve(
        &self,
        namespace: &str,
        query: &EmbeddingVector,
        top_k: usize,
    ) -> Vec<RetrievalMatch> {
        self.retrieve_with_mode(namespace, query, top_k).await.matches
    }

    pub async fn retrieve_with_mode(
        &self,
        namespace: &str,
        query: &EmbeddingVector,
        top_k: usize,
    ) -> RetrievalOutcome {
        let document_keys = self.cache.get_all_document_keys(namespace);
        if !document_keys.is_empty() {
            // Hybrid always pays for a store round-trip, even with document hits.
            let mut matches: Vec<RetrievalMatch> = document_keys
                .iter()
                .flat_map(|key| self.cache.get(key, query, top_k))
                .collect();
            matches.extend(self.query_store(namespace, query, top_k).await);
            sort_matches(&mut matches);
            matches.truncate(top_k);

            tracing::debug!(
                "Hybrid retrieval for '{}': {} document entries, {} matches",
                namespace,
                document_keys.len(),
                matches.len()
            );
            return RetrievalOutcome {
                mode: RetrievalMode::Hybrid,
                matches,
            };
        }

        let namespace_key = CacheKey::namespace(namespace);
        if self.cache.is_valid(&namespace_key) {
            let matches = self.cache.get(&namespace_key, query, top_k);
            if !matches.is_empty() {
                tracing::debug!(
                    "Cache retrieval for '{}': {} matches",
                    namespace,
                    matches.len()
                );
                return RetrievalOutcome {
                    mode: RetrievalMode::Cache,
                    matches,
                };
            }
        }

        let mut matches = self.query_store(namespace, query, top_k).await;
        sort_matches(&mut matches);
        matches.truncate(top_k);
        tracing::debug!(
            "Fallback retrieval for '{}': {} matches",
            namespace,
            matches.len()
        );
        RetrievalOutcome {
            mode: RetrievalMode::Fallback,
            matches,
        }
    }

    async fn query_store(
        &self,
        namespace: &str,
        query: &EmbeddingVector,
        top_k: usize,
    ) -> Vec<RetrievalMatch> {
        if top_k == 0 {
            return Vec::new();
        }

        let result = match tokio::time::timeout(
            self.store_timeout,
            self.store.query(namespace, query, top_k),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RagError::Timeout(self.store_timeout)),
        };

        match result {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(
                    "Persistent store query for '{}' failed, continuing without it: {}",
                    namespace,
                    err
                );
                Vec::new()
            }
        }
    }
}
