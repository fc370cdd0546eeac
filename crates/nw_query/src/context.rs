use nw_core::{CanonicalArticle, Error, QueryResult, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub sources: Vec<CanonicalArticle>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(12_000)
    }
}

impl ContextAssembler {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Joins hit texts with blank lines in ranking order. Only the text is
    /// capped at `max_chars`; every hit's article is kept.
    pub fn assemble(&self, hits: &QueryResult) -> Result<AssembledContext> {
        if self.max_chars == 0 {
            return Err(Error::Config("Context limit must be at least 1 character".to_string()));
        }

        let mut text = hits
            .iter()
            .map(|hit| hit.payload.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        if let Some((cut, _)) = text.char_indices().nth(self.max_chars) {
            text.truncate(cut);
        }

        Ok(AssembledContext {
            text,
            sources: hits.iter().map(|hit| hit.payload.schema.clone()).collect(),
        })
    }
}
