use async_trait::async_trait;
use crate::types::{CollectionSpec, QueryResult, SearchableRecord};
use crate::Result;

/// Keyed similarity-search collections.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Drop the collection if present and create it empty with the given geometry
    async fn reset_collection(&self, spec: &CollectionSpec) -> Result<()>;

    /// Insert or overwrite records, returning how many were written
    async fn upsert_batch(&self, collection: &str, records: &[SearchableRecord]) -> Result<usize>;

    /// Nearest neighbours of `vector`, best first, payload included
    async fn search(&self, collection: &str, vector: &[f32], limit: usize) -> Result<QueryResult>;

    /// Number of records currently stored
    async fn count(&self, collection: &str) -> Result<usize>;
}
