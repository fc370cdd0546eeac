use nw_core::{Error, Result, DEFAULT_VECTOR_SIZE};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod answer;
pub mod embeddings;
pub mod models;

pub use answer::{build_prompt, AnswerGenerator, NO_CONTEXT_NOTE};
pub use embeddings::{normalize_text, EmbeddingClient};
pub use models::create_model;
pub use nw_core::InferenceModel;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    OpenAi,
    Dummy,
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "dummy" => Ok(Self::Dummy),
            other => Err(Error::Config(format!(
                "Unknown model: {}. Available models: openai, dummy",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub dimension: usize,
    pub embed_timeout: Duration,
    pub generation_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .field("dimension", &self.dimension)
            .field("embed_timeout", &self.embed_timeout)
            .field("generation_timeout", &self.generation_timeout)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            dimension: DEFAULT_VECTOR_SIZE,
            embed_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(120),
        }
    }
}

pub mod prelude {
    pub use super::{Config, ModelKind};
    pub use super::models::create_model;
    pub use super::{AnswerGenerator, EmbeddingClient};
    pub use nw_core::{Error, InferenceModel, Result};
}
