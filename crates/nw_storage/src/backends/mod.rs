pub mod memory;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use memory::InMemoryStorage;

#[cfg(feature = "qdrant")]
pub use qdrant::QdrantStorage;
