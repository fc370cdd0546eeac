use async_trait::async_trait;
use nw_core::{
    CollectionSpec, Distance, Error, QueryResult, RecordPayload, Result, ScoredRecord,
    SearchableRecord, VectorIndex,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::{StorageBackend, StorageConfig};

pub struct MemoryCollection {
    spec: CollectionSpec,
    points: BTreeMap<u64, (Vec<f32>, RecordPayload)>,
}

impl MemoryCollection {
    pub fn new(spec: CollectionSpec) -> Self {
        Self {
            spec,
            points: BTreeMap::new(),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.spec.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.spec.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    pub fn upsert(&mut self, records: &[SearchableRecord]) -> Result<usize> {
        // Validate everything first so a bad record leaves the collection untouched.
        for record in records {
            self.check_dimension(&record.vector)?;
        }
        for record in records {
            self.points
                .insert(record.id, (record.vector.clone(), record.payload.clone()));
        }
        Ok(records.len())
    }

    pub fn search(&self, vector: &[f32], limit: usize) -> Result<QueryResult> {
        self.check_dimension(vector)?;
        let mut hits: Vec<ScoredRecord> = self
            .points
            .iter()
            .map(|(id, (stored, payload))| ScoredRecord {
                id: *id,
                score: score(self.spec.distance, vector, stored),
                payload: payload.clone(),
            })
            .collect();
        // Stable sort keeps ascending ids among equal scores.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn score(distance: Distance, query: &[f32], stored: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(query, stored),
        Distance::Dot => dot_product(query, stored),
    }
}

/// Process-local index. Collections live only as long as the value.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    collections: Arc<RwLock<HashMap<String, MemoryCollection>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should always be available"
    }

    async fn connect(_config: &StorageConfig) -> Result<Self> {
        Ok(Self::new())
    }
}

fn missing(collection: &str) -> Error {
    Error::IndexUnavailable(format!("Collection '{}' does not exist", collection))
}

#[async_trait]
impl VectorIndex for InMemoryStorage {
    async fn reset_collection(&self, spec: &CollectionSpec) -> Result<()> {
        if spec.dimension == 0 {
            return Err(Error::IndexUnavailable(format!(
                "Collection '{}' needs a non-zero vector size",
                spec.name
            )));
        }
        let mut collections = self.collections.write().await;
        collections.insert(spec.name.clone(), MemoryCollection::new(spec.clone()));
        Ok(())
    }

    async fn upsert_batch(&self, collection: &str, records: &[SearchableRecord]) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let target = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        target.upsert(records)
    }

    async fn search(&self, collection: &str, vector: &[f32], limit: usize) -> Result<QueryResult> {
        let collections = self.collections.read().await;
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;
        target.search(vector, limit)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(target.len())
    }
}
