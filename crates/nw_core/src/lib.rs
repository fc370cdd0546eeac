pub mod canonical;
pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use canonical::{canonicalize, search_text, Canonicalizer};
pub use error::{Error, Result};
pub use models::InferenceModel;
pub use storage::VectorIndex;
pub use types::{
    AnswerResponse, CanonicalArticle, CollectionSpec, Distance, Organization, QueryResult,
    RawFeedItem, RecordPayload, ScoredRecord, SearchableRecord, DEFAULT_VECTOR_SIZE,
};
