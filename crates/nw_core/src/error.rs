use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Generation service error: {0}")]
    GenerationService(String),

    #[error("{0}")]
    Validation(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn embedding_timeout(after: Duration) -> Self {
        Self::EmbeddingService(format!("request timed out after {}s", after.as_secs_f32()))
    }

    pub fn index_timeout(after: Duration) -> Self {
        Self::IndexUnavailable(format!("request timed out after {}s", after.as_secs_f32()))
    }

    pub fn generation_timeout(after: Duration) -> Self {
        Self::GenerationService(format!("request timed out after {}s", after.as_secs_f32()))
    }

    /// True for failures caused by the caller's input rather than a downstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
