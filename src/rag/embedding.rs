use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use reqwest::Client;
use serde_json::{json, Value};

use super::types::EmbeddingVector;
use crate::core::config::EmbeddingSettings;
use crate::core::errors::RagError;

const BATCH_CONCURRENCY: usize = 4;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds one text. Transport and API failures are `RagError::Provider`.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, RagError>;

    /// Embeds many texts; output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, RagError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for group in texts.chunks(BATCH_CONCURRENCY) {
            vectors.extend(try_join_all(group.iter().map(|text| self.embed(text))).await?);
        }
        Ok(vectors)
    }
}

/// OpenAI-compatible `/v1/embeddings` client.
#[derive(Clone)]
pub struct OpenAiEmbeddingProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(RagError::internal)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<EmbeddingVector>, RagError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(RagError::provider)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Provider(format!(
                "Embedding request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::provider)?;
        parse_embeddings(&payload, inputs.len())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, RagError> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Provider("Embedding response was empty".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}

/// Reads `data[*].embedding`, ordered by each item's `index` when present.
fn parse_embeddings(payload: &Value, expected: usize) -> Result<Vec<EmbeddingVector>, RagError> {
    let data = payload["data"]
        .as_array()
        .ok_or_else(|| RagError::Provider("Embedding response has no data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let values = item["embedding"].as_array().ok_or_else(|| {
            RagError::Provider(format!("Embedding item {} has no embedding", position))
        })?;
        let vector = values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| {
                RagError::Provider(format!("Embedding item {} has non-numeric values", position))
            })?;
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
        indexed.push((index, EmbeddingVector::new(vector)));
    }

    if indexed.len() != expected {
        return Err(RagError::Provider(format!(
            "Expected {} embeddings, got {}",
            expected,
            indexed.len()
        )));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
