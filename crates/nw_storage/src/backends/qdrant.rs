use async_trait::async_trait;
use nw_core::{
    CollectionSpec, Distance, Error, QueryResult, RecordPayload, Result, ScoredRecord,
    SearchableRecord, VectorIndex,
};
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, vectors_config::Config, CountPointsBuilder,
        CreateCollectionBuilder, Distance as QdrantDistance, GetCollectionInfoResponse,
        PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    },
    Payload, Qdrant, QdrantError,
};
use std::sync::Arc;
use tracing::{debug, warn};
use crate::{StorageBackend, StorageConfig};

fn unavailable(e: QdrantError) -> Error {
    Error::IndexUnavailable(e.to_string())
}

fn vector_size(info: GetCollectionInfoResponse, collection: &str) -> Result<usize> {
    info.result
        .and_then(|info| info.config)
        .and_then(|config| config.params)
        .and_then(|params| params.vectors_config)
        .and_then(|vectors| vectors.config)
        .and_then(|config| match config {
            Config::Params(params) => Some(params.size as usize),
            Config::ParamsMap(_) => None,
        })
        .ok_or_else(|| {
            Error::IndexUnavailable(format!(
                "Collection '{}' has no single unnamed vector configuration",
                collection
            ))
        })
}

fn to_qdrant_distance(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
        Distance::Dot => QdrantDistance::Dot,
    }
}

pub struct QdrantStorage {
    client: Arc<Qdrant>,
}

impl QdrantStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let url = config.parsed_url()?;
        let client = Qdrant::from_url(url.as_str())
            .api_key(config.api_key.clone())
            .timeout(config.timeout)
            .build()
            .map_err(unavailable)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Reads the vector size from the server on every call, so a collection
    /// recreated by another process is seen with its current size.
    async fn dimension_of(&self, collection: &str) -> Result<usize> {
        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(unavailable)?;
        vector_size(info, collection)
    }

    fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
        if vector.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn to_point(record: &SearchableRecord) -> Result<PointStruct> {
        let payload = Payload::try_from(serde_json::to_value(&record.payload)?)
            .map_err(|e| Error::External(e.into()))?;
        Ok(PointStruct::new(record.id, record.vector.clone(), payload))
    }

    fn from_point(point: ScoredPoint) -> Option<ScoredRecord> {
        let id = match point.id.and_then(|id| id.point_id_options) {
            Some(PointIdOptions::Num(id)) => id,
            other => {
                warn!("⚠️ Skipping hit with non-numeric id: {:?}", other);
                return None;
            }
        };
        let payload: serde_json::Map<String, serde_json::Value> = point
            .payload
            .into_iter()
            .map(|(key, value)| (key, value.into_json()))
            .collect();
        match serde_json::from_value::<RecordPayload>(serde_json::Value::Object(payload)) {
            Ok(payload) => Some(ScoredRecord {
                id,
                score: point.score,
                payload,
            }),
            Err(e) => {
                warn!("⚠️ Skipping hit {} with unreadable payload: {}", id, e);
                None
            }
        }
    }
}

#[async_trait]
impl StorageBackend for QdrantStorage {
    fn get_error_message() -> &'static str {
        "Qdrant should be running and reachable over gRPC (default http://localhost:6334)"
    }

    async fn connect(config: &StorageConfig) -> Result<Self> {
        let storage = Self::new(config)?;
        storage
            .client
            .health_check()
            .await
            .map_err(unavailable)?;
        Ok(storage)
    }
}

#[async_trait]
impl VectorIndex for QdrantStorage {
    async fn reset_collection(&self, spec: &CollectionSpec) -> Result<()> {
        if self
            .client
            .collection_exists(spec.name.as_str())
            .await
            .map_err(unavailable)?
        {
            debug!("Dropping existing collection {}", spec.name);
            self.client
                .delete_collection(spec.name.as_str())
                .await
                .map_err(unavailable)?;
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(spec.name.clone()).vectors_config(
                    VectorParamsBuilder::new(spec.dimension as u64, to_qdrant_distance(spec.distance)),
                ),
            )
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn upsert_batch(&self, collection: &str, records: &[SearchableRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let expected = self.dimension_of(collection).await?;
        for record in records {
            Self::check_dimension(expected, &record.vector)?;
        }

        let points = records
            .iter()
            .map(Self::to_point)
            .collect::<Result<Vec<_>>>()?;
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(unavailable)?;
        Ok(records.len())
    }

    async fn search(&self, collection: &str, vector: &[f32], limit: usize) -> Result<QueryResult> {
        Self::check_dimension(self.dimension_of(collection).await?, vector)?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(unavailable)?;

        Ok(response
            .result
            .into_iter()
            .filter_map(Self::from_point)
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(unavailable)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}
