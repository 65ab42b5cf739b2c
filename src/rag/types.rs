//! Records shared by the chunker, cache, stores and retriever.

use serde::{Deserialize, Serialize};

use crate::vector_math;

/// A bounded text segment, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position within the chunked source, starting at 0.
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters, the unit every size limit is expressed in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Embedding of one chunk or query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        vector_math::l2_norm(&self.0) <= f32::EPSILON
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Where a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    NamespaceCache,
    DocumentCache,
    Store,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub text: String,
    pub score: f32,
    pub source: MatchSource,
}

impl RetrievalMatch {
    pub fn new(text: impl Into<String>, score: f32, source: MatchSource) -> Self {
        Self {
            text: text.into(),
            score,
            source,
        }
    }
}

/// Stable best-first sort; ties keep discovery order.
pub fn sort_matches(matches: &mut [RetrievalMatch]) {
    matches.sort_by(|a, b| vector_math::descending(a.score, b.score));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_length_counts_characters() {
        let chunk = Chunk::new(0, "café");
        assert_eq!(chunk.char_len(), 4);
        assert_eq!(chunk.text.len(), 5);
    }

    #[test]
    fn zero_vector_is_detected() {
        assert!(EmbeddingVector::new(vec![0.0, 0.0]).is_zero());
        assert!(!EmbeddingVector::new(vec![0.0, 0.1]).is_zero());
    }

    #[test]
    fn sort_matches_is_descending_and_stable() {
        let mut matches = vec![
            RetrievalMatch::new("a", 0.5, MatchSource::Store),
            RetrievalMatch::new("b", 0.9, MatchSource::DocumentCache),
            RetrievalMatch::new("c", 0.5, MatchSource::DocumentCache),
            RetrievalMatch::new("d", 0.7, MatchSource::Store),
        ];
        sort_matches(&mut matches);

        let texts: Vec<&str> = matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn embedding_serializes_as_plain_array() {
        let json = serde_json::to_string(&EmbeddingVector::new(vec![1.0, 0.5])).unwrap();
        assert_eq!(json, "[1.0,0.5]");
    }
}
