use async_trait::async_trait;
use std::fmt;
use crate::Result;

/// An external model service that can embed text and complete prompts.
#[async_trait]
pub trait InferenceModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Length of the vectors returned by `generate_embeddings`.
    fn dimension(&self) -> usize;

    /// Generate embeddings for a piece of text
    async fn generate_embeddings(&self, text: &str) -> Result<Vec<f32>>;

    /// Complete a single user prompt
    async fn complete(&self, prompt: &str) -> Result<String>;
}
