use std::path::PathBuf;
use std::sync::Arc;
use nw_query::QueryOrchestrator;

pub struct AppState {
    pub orchestrator: Arc<QueryOrchestrator>,
    /// Local feed file served at `/feed.xml`, if any.
    pub feed_path: Option<PathBuf>,
    /// Directory holding `.well-known/ai-plugin.json` and `openapi.yaml`.
    pub manifest_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(orchestrator: Arc<QueryOrchestrator>) -> Self {
        Self {
            orchestrator,
            feed_path: None,
            manifest_dir: None,
        }
    }

    pub fn with_feed_path(mut self, path: Option<PathBuf>) -> Self {
        self.feed_path = path;
        self
    }

    pub fn with_manifest_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.manifest_dir = dir;
        self
    }
}
