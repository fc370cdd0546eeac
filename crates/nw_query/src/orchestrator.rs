use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use nw_core::{AnswerResponse, Error, InferenceModel, Result, VectorIndex};
use nw_inference::{build_prompt, AnswerGenerator, EmbeddingClient};
use tracing::{debug, info, warn};
use crate::context::ContextAssembler;
use crate::retriever::Retriever;

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub collection: String,
    pub limit: usize,
    pub max_context_chars: usize,
    pub embed_timeout: Duration,
    pub search_timeout: Duration,
    pub generation_timeout: Duration,
}

impl QueryConfig {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            limit: 3,
            max_context_chars: 12_000,
            embed_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(120),
        }
    }
}

/// Where a query is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Received,
    Embedded,
    Retrieved,
    Assembled,
    Generated,
    Responded,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Embedded => "embedded",
            Self::Retrieved => "retrieved",
            Self::Assembled => "assembled",
            Self::Generated => "generated",
            Self::Responded => "responded",
        };
        f.write_str(name)
    }
}

pub struct QueryOrchestrator {
    embedder: EmbeddingClient,
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: AnswerGenerator,
}

impl QueryOrchestrator {
    pub fn new(
        embedder: EmbeddingClient,
        retriever: Retriever,
        assembler: ContextAssembler,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            embedder,
            retriever,
            assembler,
            generator,
        }
    }

    /// Wires the pipeline from one model and one index.
    pub fn from_parts(model: Arc<dyn InferenceModel>, index: Arc<dyn VectorIndex>, config: &QueryConfig) -> Self {
        Self::new(
            EmbeddingClient::new(model.clone(), config.embed_timeout),
            Retriever::new(index, config.collection.clone(), config.limit, config.search_timeout),
            ContextAssembler::new(config.max_context_chars),
            AnswerGenerator::new(model, config.generation_timeout),
        )
    }

    /// Answers `query` from the indexed news. Either the whole response is
    /// produced or the first failing stage's error is returned.
    pub async fn answer(&self, query: Option<&str>) -> Result<AnswerResponse> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::Validation("Missing query parameter 'q'".to_string()))?;
        info!("🔍 Query: {}", query);

        let mut stage = QueryStage::Received;
        let result = self.run(query, &mut stage).await;
        match &result {
            Ok(response) => debug!(
                "Query {} with {} sources",
                QueryStage::Responded,
                response.source_data.len()
            ),
            Err(e) => warn!("⚠️ Query failed after stage {}: {}", stage, e),
        }
        result
    }

    async fn run(&self, query: &str, stage: &mut QueryStage) -> Result<AnswerResponse> {
        let vector = self.embedder.embed(query).await?;
        *stage = QueryStage::Embedded;
        debug!("Query {}", stage);

        let hits = self.retriever.retrieve(&vector).await?;
        *stage = QueryStage::Retrieved;
        debug!("Query {} ({} hits)", stage, hits.len());

        let context = self.assembler.assemble(&hits)?;
        *stage = QueryStage::Assembled;
        if context.is_empty() {
            debug!("No context found for query");
        }

        let answer = self.generator.generate(&build_prompt(&context.text, query)).await?;
        *stage = QueryStage::Generated;
        debug!("Query {}", stage);

        Ok(AnswerResponse {
            answer,
            source_data: context.sources,
        })
    }
}
