use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::embedding::EmbeddingProvider;
use super::retriever::HybridRetriever;
use crate::core::config::RetrievalSettings;
use crate::core::errors::RagError;

/// Source of grounding text for a user question.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Newline-joined match texts; empty when nothing relevant was found
    /// or retrieval failed.
    async fn get_context(&self, namespace: &str, query: &str) -> String;
}

/// Embed, retrieve, join. Never fails; failures degrade to an empty context.
#[derive(Clone)]
pub struct RagContextService {
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: HybridRetriever,
    top_k: usize,
    embed_timeout: Duration,
}

impl RagContextService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        retriever: HybridRetriever,
        settings: &RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            retriever,
            top_k: settings.top_k,
            embed_timeout: settings.embed_timeout(),
        }
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    async fn try_get_context(&self, namespace: &str, query: &str) -> Result<String, RagError> {
        let vector = tokio::time::timeout(self.embed_timeout, self.embedder.embed(query))
            .await
            .map_err(|_| RagError::Timeout(self.embed_timeout))??;

        let matches = self.retriever.retrieve(namespace, &vector, self.top_k).await;
        Ok(matches
            .into_iter()
            .map(|m| m.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait]
impl ContextProvider for RagContextService {
    async fn get_context(&self, namespace: &str, query: &str) -> String {
        if query.trim().is_empty() {
            return String::new();
        }
        match self.try_get_context(namespace, query).await {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(
                    "Context lookup for '{}' failed, answering without grounding: {}",
                    namespace,
                    err
                );
                String::new()
            }
        }
    }
}
