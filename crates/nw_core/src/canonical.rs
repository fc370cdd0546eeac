use crate::types::{
    CanonicalArticle, Organization, RawFeedItem, ARTICLE_TYPE, DEFAULT_HEADLINE, DEFAULT_PUBLISHER,
};

/// Maps raw feed entries onto the fixed `NewsArticle` shape.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    publisher: String,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISHER)
    }
}

impl Canonicalizer {
    pub fn new(publisher: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
        }
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    /// Builds the article and the text that gets embedded for it.
    /// Missing or blank fields fall back to defaults; nothing here can fail.
    pub fn canonicalize(&self, item: &RawFeedItem) -> (CanonicalArticle, String) {
        let headline = non_blank(item.title.as_deref()).unwrap_or(DEFAULT_HEADLINE);
        let description = non_blank(item.description.as_deref()).unwrap_or_default();

        let article = CanonicalArticle {
            kind: ARTICLE_TYPE.to_string(),
            headline: headline.to_string(),
            description: description.to_string(),
            url: non_blank(item.link.as_deref()).unwrap_or_default().to_string(),
            date_published: non_blank(item.pub_date.as_deref()).unwrap_or_default().to_string(),
            author: Organization::new(self.publisher.clone()),
        };
        let text = search_text(&article);
        (article, text)
    }
}

/// `headline. description`
pub fn search_text(article: &CanonicalArticle) -> String {
    format!("{}. {}", article.headline, article.description)
}

/// Canonicalizes with the default publisher.
pub fn canonicalize(item: &RawFeedItem) -> (CanonicalArticle, String) {
    Canonicalizer::default().canonicalize(item)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
