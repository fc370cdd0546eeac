use std::sync::Arc;
use std::time::Duration;
use nw_core::{Error, Result};
use tokio::time::timeout;
use super::InferenceModel;

/// Stands in for the context when retrieval found nothing.
pub const NO_CONTEXT_NOTE: &str = "No context found.";

pub fn build_prompt(context: &str, query: &str) -> String {
    let context = if context.trim().is_empty() {
        NO_CONTEXT_NOTE
    } else {
        context
    };
    format!(
        "Context:\n{}\n\nQuestion: {}\n\nAnswer using the context.",
        context, query
    )
}

#[derive(Debug, Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn InferenceModel>,
    timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn InferenceModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        timeout(self.timeout, self.model.complete(prompt))
            .await
            .map_err(|_| Error::generation_timeout(self.timeout))?
    }

    pub async fn answer(&self, context: &str, query: &str) -> Result<String> {
        self.generate(&build_prompt(context, query)).await
    }
}
