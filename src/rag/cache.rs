//! Short-lived in-process vector cache.
//!
//! Entries are keyed either by namespace or by `(namespace, doc_id)` and expire
//! on wall-clock time. Expiry is evaluated on every read; [`VectorCache::cleanup`]
//! (optionally driven by [`VectorCache::spawn_cleanup`]) only reclaims memory.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use super::types::{Chunk, EmbeddingVector, MatchSource, RetrievalMatch};
use crate::core::clock::{add_ttl, Clock, SystemClock};
use crate::core::errors::RagError;
use crate::vector_math;

/// Cache key. The derived ordering groups every document entry of a namespace
/// together, which keeps document discovery order deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheKey {
    Namespace { namespace: String },
    Document { namespace: String, doc_id: String },
}

impl CacheKey {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        CacheKey::Namespace {
            namespace: namespace.into(),
        }
    }

    pub fn document(namespace: impl Into<String>, doc_id: impl Into<String>) -> Self {
        CacheKey::Document {
            namespace: namespace.into(),
            doc_id: doc_id.into(),
        }
    }

    pub fn namespace_name(&self) -> &str {
        match self {
            CacheKey::Namespace { namespace } | CacheKey::Document { namespace, .. } => namespace,
        }
    }

    pub fn doc_id(&self) -> Option<&str> {
        match self {
            CacheKey::Namespace { .. } => None,
            CacheKey::Document { doc_id, .. } => Some(doc_id),
        }
    }

    fn match_source(&self) -> MatchSource {
        match self {
            CacheKey::Namespace { .. } => MatchSource::NamespaceCache,
            CacheKey::Document { .. } => MatchSource::DocumentCache,
        }
    }

    fn validate(&self) -> Result<(), RagError> {
        if self.namespace_name().trim().is_empty() {
            return Err(RagError::Validation("cache key namespace is empty".to_string()));
        }
        if matches!(self.doc_id(), Some(doc_id) if doc_id.trim().is_empty()) {
            return Err(RagError::Validation("cache key doc_id is empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Namespace { namespace } => write!(f, "{}", namespace),
            CacheKey::Document { namespace, doc_id } => write!(f, "{}/{}", namespace, doc_id),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    vectors: Vec<EmbeddingVector>,
    chunks: Vec<Chunk>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryStatus {
    pub key: String,
    pub exists: bool,
    pub live: bool,
    pub vector_count: usize,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub time_remaining_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStatus {
    pub total_entries: usize,
    pub live_entries: usize,
    pub total_vectors: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CacheStatus {
    Entry(EntryStatus),
    Aggregate(AggregateStatus),
}

/// Thread-safe TTL vector cache.
///
/// Entries are stored behind `Arc` so a reader scores a consistent snapshot
/// without holding the lock, and a concurrent `put` swaps the whole entry.
pub struct VectorCache {
    entries: RwLock<BTreeMap<CacheKey, Arc<CacheEntry>>>,
    clock: Arc<dyn Clock>,
}

impl Default for VectorCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for VectorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl VectorCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            clock,
        }
    }

    /// Replaces the entry under `key`. Rejected input leaves the cache untouched.
    pub fn put(
        &self,
        key: CacheKey,
        vectors: Vec<EmbeddingVector>,
        chunks: Vec<Chunk>,
        ttl: Duration,
    ) -> Result<(), RagError> {
        key.validate()?;
        validate_entry(&vectors, &chunks)?;

        let now = self.clock.now();
        let entry = Arc::new(CacheEntry {
            vectors,
            chunks,
            created_at: now,
            expires_at: add_ttl(now, ttl),
        });
        let count = entry.vectors.len();

        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), entry);

        tracing::info!(
            "Cached {} vectors under '{}' (ttl {}s)",
            count,
            key,
            ttl.as_secs()
        );
        Ok(())
    }

    pub fn put_document(
        &self,
        namespace: &str,
        doc_id: &str,
        vectors: Vec<EmbeddingVector>,
        chunks: Vec<Chunk>,
        ttl: Duration,
    ) -> Result<(), RagError> {
        self.put(CacheKey::document(namespace, doc_id), vectors, chunks, ttl)
    }

    /// Top `top_k` chunks of a live entry by cosine similarity.
    /// A missing or expired entry yields no matches.
    pub fn get(&self, key: &CacheKey, query: &EmbeddingVector, top_k: usize) -> Vec<RetrievalMatch> {
        if top_k == 0 {
            return Vec::new();
        }
        let Some(entry) = self.live_entry(key) else {
            return Vec::new();
        };

        let source = key.match_source();
        vector_math::rank_descending_by_cosine(query.as_slice(), &entry.vectors)
            .into_iter()
            .take(top_k)
            .filter_map(|(idx, score)| {
                entry
                    .chunks
                    .get(idx)
                    .map(|chunk| RetrievalMatch::new(chunk.text.clone(), score, source))
            })
            .collect()
    }

    pub fn is_valid(&self, key: &CacheKey) -> bool {
        self.live_entry(key).is_some()
    }

    /// Drops every entry with `now >= expires_at`; returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let evicted = before - entries.len();
        drop(entries);

        if evicted > 0 {
            tracing::info!("Evicted {} expired cache entries", evicted);
        }
        evicted
    }

    pub fn get_status(&self, key: Option<&CacheKey>) -> CacheStatus {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());

        let Some(key) = key else {
            return CacheStatus::Aggregate(AggregateStatus {
                total_entries: entries.len(),
                live_entries: entries.values().filter(|e| e.is_live(now)).count(),
                total_vectors: entries.values().map(|e| e.vectors.len()).sum(),
                keys: entries.keys().map(ToString::to_string).collect(),
            });
        };

        let status = match entries.get(key) {
            Some(entry) => EntryStatus {
                key: key.to_string(),
                exists: true,
                live: entry.is_live(now),
                vector_count: entry.vectors.len(),
                created_at: Some(entry.created_at),
                expires_at: Some(entry.expires_at),
                time_remaining_ms: (entry.expires_at - now).num_milliseconds().max(0) as u64,
            },
            None => EntryStatus {
                key: key.to_string(),
                exists: false,
                live: false,
                vector_count: 0,
                created_at: None,
                expires_at: None,
                time_remaining_ms: 0,
            },
        };
        CacheStatus::Entry(status)
    }

    /// Live document keys of `namespace`, ordered by doc id.
    pub fn get_all_document_keys(&self, namespace: &str) -> Vec<CacheKey> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|(key, entry)| {
                matches!(key, CacheKey::Document { namespace: ns, .. } if ns == namespace)
                    && entry.is_live(now)
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn delete_document(&self, namespace: &str, doc_id: &str) -> bool {
        self.delete(&CacheKey::document(namespace, doc_id))
    }

    pub fn delete(&self, key: &CacheKey) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some();
        if removed {
            tracing::info!("Removed cache entry '{}'", key);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodic sweep on the tokio runtime. The task ends once the cache is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.cleanup();
            }
        })
    }

    fn live_entry(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).filter(|entry| entry.is_live(now)).cloned()
    }
}

fn validate_entry(vectors: &[EmbeddingVector], chunks: &[Chunk]) -> Result<(), RagError> {
    if vectors.is_empty() || chunks.is_empty() {
        return Err(RagError::Validation(
            "vectors and chunks must both be non-empty".to_string(),
        ));
    }
    if vectors.len() != chunks.len() {
        return Err(RagError::Validation(format!(
            "vector/chunk length mismatch: {} vectors, {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }

    let dim = vectors[0].dim();
    if dim == 0 {
        return Err(RagError::Validation("embedding vectors are empty".to_string()));
    }
    if let Some(pos) = vectors.iter().position(|v| v.dim() != dim) {
        return Err(RagError::Validation(format!(
            "inconsistent embedding dimension at position {}: expected {}, got {}",
            pos,
            dim,
            vectors[pos].dim()
        )));
    }
    Ok(())
}
