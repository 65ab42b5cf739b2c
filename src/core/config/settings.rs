//! Typed runtime settings, deserialized from the merged YAML tree.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub chunker: ChunkerSettings,
    pub cache: CacheSettings,
    pub retrieval: RetrievalSettings,
    pub session: SessionSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerSettings {
    pub target_size: usize,
    pub extended_size: usize,
}

impl Default for ChunkerSettings {
    fn default() -> Self {
        Self {
            target_size: defaults::TARGET_CHUNK_SIZE,
            extended_size: defaults::EXTENDED_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub namespace_ttl_secs: u64,
    pub document_ttl_secs: u64,
    /// `0` disables the background sweep; expiry is still enforced on read.
    pub cleanup_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            namespace_ttl_secs: defaults::NAMESPACE_TTL_SECS,
            document_ttl_secs: defaults::DOCUMENT_TTL_SECS,
            cleanup_interval_secs: defaults::CLEANUP_INTERVAL_SECS,
        }
    }
}

impl CacheSettings {
    pub fn namespace_ttl(&self) -> Duration {
        Duration::from_secs(self.namespace_ttl_secs)
    }

    pub fn document_ttl(&self) -> Duration {
        Duration::from_secs(self.document_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub store_timeout_ms: u64,
    pub embed_timeout_ms: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: defaults::RETRIEVAL_TOP_K,
            store_timeout_ms: defaults::STORE_TIMEOUT_MS,
            embed_timeout_ms: defaults::EMBED_TIMEOUT_MS,
        }
    }
}

impl RetrievalSettings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// History window, counted in user/assistant pairs.
    pub max_history: usize,
    pub max_sessions: usize,
    pub idle_ttl_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_history: defaults::MAX_HISTORY_PAIRS,
            max_sessions: defaults::MAX_SESSIONS,
            idle_ttl_secs: defaults::SESSION_IDLE_TTL_SECS,
        }
    }
}

impl SessionSettings {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: defaults::EMBEDDING_BASE_URL.to_string(),
            model: defaults::EMBEDDING_MODEL.to_string(),
            api_key: None,
            request_timeout_secs: defaults::EMBEDDING_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Falls back to `AppPaths::db_path` when unset.
    pub db_file: Option<PathBuf>,
    pub upsert_batch_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_file: None,
            upsert_batch_size: defaults::UPSERT_BATCH_SIZE,
        }
    }
}
