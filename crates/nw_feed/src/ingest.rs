use std::sync::Arc;
use futures::future::join_all;
use nw_core::{
    Canonicalizer, CollectionSpec, Error, RawFeedItem, RecordPayload, Result, SearchableRecord,
    VectorIndex,
};
use nw_inference::EmbeddingClient;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub collection: CollectionSpec,
    /// Records per upsert call.
    pub batch_size: usize,
    /// Embedding calls in flight at once.
    pub concurrency: usize,
}

impl IngestConfig {
    pub fn new(collection: CollectionSpec) -> Self {
        Self {
            collection,
            batch_size: 64,
            concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub index: usize,
    pub headline: String,
    pub reason: String,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Embedded(SearchableRecord),
    Skipped(SkippedItem),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub total: usize,
    pub upserted: usize,
    pub skipped: Vec<SkippedItem>,
}

impl IngestReport {
    /// Some items were loaded but not all of them.
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty() && self.upserted > 0
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct IngestManager {
    index: Arc<dyn VectorIndex>,
    embedder: EmbeddingClient,
    canonicalizer: Canonicalizer,
    config: IngestConfig,
}

impl IngestManager {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: EmbeddingClient,
        canonicalizer: Canonicalizer,
        config: IngestConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            canonicalizer,
            config,
        }
    }

    pub fn collection(&self) -> &str {
        &self.config.collection.name
    }

    async fn process_item(&self, index: usize, item: &RawFeedItem) -> ItemOutcome {
        let (schema, text) = self.canonicalizer.canonicalize(item);
        match self.embedder.embed(&text).await {
            Ok(vector) => {
                info!("   - Processed: {}", schema.headline.chars().take(30).collect::<String>());
                ItemOutcome::Embedded(SearchableRecord {
                    id: index as u64,
                    vector,
                    payload: RecordPayload { text, schema },
                })
            }
            Err(e) => {
                warn!("   ⚠️ Error in item {}: {}", index, e);
                ItemOutcome::Skipped(SkippedItem {
                    index,
                    headline: schema.headline,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Replaces the collection's contents with the records derived from `items`.
    ///
    /// Items whose embedding fails are skipped and listed in the report.
    /// Failing to reset the collection aborts the run before anything is embedded.
    pub async fn run(&self, items: &[RawFeedItem]) -> Result<IngestReport> {
        let spec = &self.config.collection;
        if self.embedder.dimension() != spec.dimension {
            return Err(Error::DimensionMismatch {
                expected: spec.dimension,
                actual: self.embedder.dimension(),
            });
        }

        info!("💾 Resetting collection {}...", spec.name);
        self.index.reset_collection(spec).await?;

        info!("🧠 Canonicalizing {} items to NewsArticle...", items.len());
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let futures = items.iter().enumerate().map(|(index, item)| {
            let semaphore = semaphore.clone();
            async move {
                match semaphore.acquire().await {
                    Ok(_permit) => self.process_item(index, item).await,
                    Err(e) => ItemOutcome::Skipped(SkippedItem {
                        index,
                        headline: item.title.clone().unwrap_or_default(),
                        reason: e.to_string(),
                    }),
                }
            }
        });

        // join_all yields outcomes in feed order, so ids follow item positions.
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for outcome in join_all(futures).await {
            match outcome {
                ItemOutcome::Embedded(record) => records.push(record),
                ItemOutcome::Skipped(item) => skipped.push(item),
            }
        }

        let mut upserted = 0;
        for batch in records.chunks(self.config.batch_size.max(1)) {
            upserted += self.index.upsert_batch(&spec.name, batch).await?;
        }

        let report = IngestReport {
            collection: spec.name.clone(),
            total: items.len(),
            upserted,
            skipped,
        };
        if report.is_complete() {
            info!("✅ Loaded {} of {} items into {}", report.upserted, report.total, report.collection);
        } else {
            warn!(
                "⚠️ Loaded {} of {} items into {} ({} skipped)",
                report.upserted,
                report.total,
                report.collection,
                report.skipped.len()
            );
        }
        Ok(report)
    }
}
