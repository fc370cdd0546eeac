use std::sync::Arc;
use nw_core::Result;
use tracing::info;
use crate::{Config, ModelKind};

pub use nw_core::InferenceModel;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

pub fn create_model(kind: ModelKind, config: &Config) -> Result<Arc<dyn InferenceModel>> {
    let model: Arc<dyn InferenceModel> = match kind {
        ModelKind::OpenAi => Arc::new(OpenAiModel::new(config)?),
        ModelKind::Dummy => Arc::new(DummyModel::new(config.dimension)),
    };
    info!("🧠 Inference model initialized (using {})", model.name());
    Ok(model)
}
