use std::sync::Arc;
use std::time::Duration;
use nw_core::{Error, QueryResult, Result, VectorIndex};
use tokio::time::timeout;
use tracing::debug;

pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    collection: String,
    limit: usize,
    timeout: Duration,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, collection: impl Into<String>, limit: usize, timeout: Duration) -> Self {
        Self {
            index,
            collection: collection.into(),
            limit,
            timeout,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Top hits for `vector`, best first. No retries: an unreachable index is
    /// reported straight back.
    pub async fn retrieve(&self, vector: &[f32]) -> Result<QueryResult> {
        if self.limit == 0 {
            return Err(Error::Config("Search limit must be at least 1".to_string()));
        }

        let mut hits = timeout(
            self.timeout,
            self.index.search(&self.collection, vector, self.limit),
        )
        .await
        .map_err(|_| Error::index_timeout(self.timeout))??;

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(self.limit);
        debug!("Retrieved {} hits from {}", hits.len(), self.collection);
        Ok(hits)
    }
}
