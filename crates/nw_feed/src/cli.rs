use clap::Args;
use nw_core::{CollectionSpec, Result};
use crate::feed::{load_feed, FeedSource};
use crate::ingest::{IngestConfig, IngestManager, IngestReport};

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Feed to load: a local RSS/JSON file or an http(s) URL
    #[arg(long, env = "FEED_SOURCE", default_value = "feed.xml")]
    pub feed: FeedSource,
    /// Records sent per upsert call
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,
    /// Embedding requests in flight at once
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,
    /// Organization credited as author of every article
    #[arg(long, env = "FEED_PUBLISHER", default_value = nw_core::types::DEFAULT_PUBLISHER)]
    pub publisher: String,
}

impl IngestArgs {
    pub fn ingest_config(&self, collection: CollectionSpec) -> IngestConfig {
        IngestConfig {
            collection,
            batch_size: self.batch_size,
            concurrency: self.concurrency,
        }
    }
}

/// Loads the feed and runs a full ingest, printing a summary.
pub async fn handle_command(args: &IngestArgs, manager: &IngestManager) -> Result<IngestReport> {
    let items = load_feed(&args.feed).await?;
    let report = manager.run(&items).await?;

    println!(
        "Loaded {}/{} items into '{}'",
        report.upserted, report.total, report.collection
    );
    for skipped in &report.skipped {
        eprintln!("  skipped #{} {}: {}", skipped.index, skipped.headline, skipped.reason);
    }
    Ok(report)
}
