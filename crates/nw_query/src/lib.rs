pub mod context;
pub mod orchestrator;
pub mod retriever;

pub use context::{AssembledContext, ContextAssembler};
pub use orchestrator::{QueryConfig, QueryOrchestrator, QueryStage};
pub use retriever::Retriever;

pub mod prelude {
    pub use super::{QueryConfig, QueryOrchestrator};
    pub use nw_core::{AnswerResponse, Error, Result};
}
