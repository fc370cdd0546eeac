use async_trait::async_trait;
use nw_core::{Distance, Error, Result, VectorIndex, DEFAULT_VECTOR_SIZE};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

pub mod backends;

pub use backends::*;

pub const DEFAULT_COLLECTION: &str = "noticias-futuro";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

#[async_trait]
pub trait StorageBackend: VectorIndex + Sized {
    /// Hint shown to the operator when the backend cannot be reached.
    fn get_error_message() -> &'static str;
    async fn connect(config: &StorageConfig) -> Result<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Qdrant,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub vector_size: usize,
    pub distance: Distance,
    pub timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            api_key: None,
            collection: DEFAULT_COLLECTION.to_string(),
            vector_size: DEFAULT_VECTOR_SIZE,
            distance: Distance::Cosine,
            timeout: Duration::from_secs(10),
        }
    }
}

impl StorageConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn parsed_url(&self) -> Result<Url> {
        Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("Invalid storage URL '{}': {}", self.url, e)))
    }

    pub fn collection_spec(&self) -> nw_core::CollectionSpec {
        nw_core::CollectionSpec::new(self.collection.clone(), self.vector_size)
            .with_distance(self.distance)
    }
}

async fn connect<T: StorageBackend + 'static>(config: &StorageConfig) -> Result<Arc<dyn VectorIndex>> {
    match T::connect(config).await {
        Ok(storage) => Ok(Arc::new(storage)),
        Err(e) => Err(Error::IndexUnavailable(format!("{} ({})", e, T::get_error_message()))),
    }
}

pub async fn create_storage(kind: StorageKind, config: &StorageConfig) -> Result<Arc<dyn VectorIndex>> {
    let storage = match kind {
        StorageKind::Memory => connect::<InMemoryStorage>(config).await?,
        #[cfg(feature = "qdrant")]
        StorageKind::Qdrant => connect::<QdrantStorage>(config).await?,
        #[cfg(not(feature = "qdrant"))]
        StorageKind::Qdrant => {
            return Err(Error::Config(
                "Qdrant support is not compiled in; rebuild with the `qdrant` feature".to_string(),
            ))
        }
    };
    info!("🏦 Storage backend ready ({:?}, collection {})", kind, config.collection);
    Ok(storage)
}

pub mod prelude {
    pub use super::{create_storage, StorageConfig, StorageKind};
    pub use super::backends::*;
}
