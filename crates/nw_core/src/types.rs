use serde::{Deserialize, Serialize};

pub const ARTICLE_TYPE: &str = "NewsArticle";
pub const ORGANIZATION_TYPE: &str = "Organization";
pub const DEFAULT_PUBLISHER: &str = "BuzzFeed";
pub const DEFAULT_HEADLINE: &str = "untitled";
pub const DEFAULT_VECTOR_SIZE: usize = 1536;

/// One entry as read from a news feed. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFeedItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, rename = "pubDate", alias = "pub_date")]
    pub pub_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "@type", default = "organization_type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: ORGANIZATION_TYPE.to_string(),
            name: name.into(),
        }
    }
}

fn organization_type() -> String {
    ORGANIZATION_TYPE.to_string()
}

fn article_type() -> String {
    ARTICLE_TYPE.to_string()
}

fn default_author() -> Organization {
    Organization::new(DEFAULT_PUBLISHER)
}

/// schema.org `NewsArticle` metadata stored with every record and handed back
/// to callers as `source_data`. Always serializes with the same set of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalArticle {
    #[serde(rename = "@type", default = "article_type")]
    pub kind: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "datePublished", default)]
    pub date_published: String,
    #[serde(default = "default_author")]
    pub author: Organization,
}

/// What is stored next to the vector: the text that was embedded and the
/// structured article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub text: String,
    pub schema: CanonicalArticle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableRecord {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: RecordPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: u64,
    pub score: f32,
    pub payload: RecordPayload,
}

/// Hits ordered by descending similarity.
pub type QueryResult = Vec<ScoredRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
}

impl std::str::FromStr for Distance {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            other => Err(crate::Error::Config(format!("Unknown distance metric: {}", other))),
        }
    }
}

/// Geometry used when (re)creating a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance: Distance::Cosine,
        }
    }

    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub source_data: Vec<CanonicalArticle>,
}
