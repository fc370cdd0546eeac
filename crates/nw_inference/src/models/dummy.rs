use std::fmt;
use nw_core::Result;
use sha2::{Digest, Sha256};
use super::InferenceModel;

/// Offline stand-in for a real model. Embeddings are hashed bags of words,
/// so texts sharing words land near each other; completions restate the
/// first line of context.
pub struct DummyModel {
    dimension: usize,
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel")
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl DummyModel {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

fn bucket(token: &str, dimension: usize) -> (usize, f32) {
    let digest = Sha256::digest(token.as_bytes());
    let mut index = [0u8; 8];
    index.copy_from_slice(&digest[..8]);
    let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
    ((u64::from_le_bytes(index) % dimension as u64) as usize, sign)
}

fn prompt_section<'a>(prompt: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = prompt.find(start)? + start.len();
    let rest = &prompt[from..];
    let to = rest.find(end).unwrap_or(rest.len());
    Some(rest[..to].trim())
}

#[async_trait::async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn generate_embeddings(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0; self.dimension];
        if self.dimension == 0 {
            return Ok(embedding);
        }

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let (index, sign) = bucket(&token.to_lowercase(), self.dimension);
            embedding[index] += sign;
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(embedding)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let question = prompt_section(prompt, "Question:", "\n\n").unwrap_or_default();
        let context = prompt_section(prompt, "Context:", "\n\nQuestion:").unwrap_or_default();
        let first = context
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && *line != crate::NO_CONTEXT_NOTE);

        Ok(match first {
            Some(line) => format!("Based on the news: {}", line),
            None => format!("I could not find any news about: {}", question),
        })
    }
}
