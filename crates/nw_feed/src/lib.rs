pub mod cli;
pub mod feed;
pub mod ingest;

pub use cli::{handle_command, IngestArgs};
pub use feed::{load_feed, parse_feed, FeedSource};
pub use ingest::{IngestConfig, IngestManager, IngestReport, ItemOutcome, SkippedItem};

pub mod prelude {
    pub use super::feed::{load_feed, FeedSource};
    pub use super::ingest::{IngestConfig, IngestManager, IngestReport};
    pub use nw_core::{RawFeedItem, Result, Error};
}
