use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),
    #[error("store error: {0}")]
    Store(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }

    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        RagError::Store(err.to_string())
    }

    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        RagError::Provider(err.to_string())
    }

    /// Transport-level failures a caller may back off and retry.
    /// Validation and config errors need a fix on the caller's side instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::Provider(_) | RagError::Timeout(_) | RagError::Store(_)
        )
    }
}
