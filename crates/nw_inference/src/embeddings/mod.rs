use std::sync::Arc;
use std::time::Duration;
use nw_core::{Error, Result};
use tokio::time::timeout;
use super::InferenceModel;

/// Newlines become spaces before text is sent for embedding.
pub fn normalize_text(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    model: Arc<dyn InferenceModel>,
    timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(model: Arc<dyn InferenceModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Embeds `text`, failing on empty input, timeouts and vectors of the wrong length.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = normalize_text(text);
        if text.trim().is_empty() {
            return Err(Error::Validation("Cannot embed empty text".to_string()));
        }

        let vector = timeout(self.timeout, self.model.generate_embeddings(&text))
            .await
            .map_err(|_| Error::embedding_timeout(self.timeout))??;

        let expected = self.model.dimension();
        if vector.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}
