use anyhow::{bail, Context};
use clap::Parser;
use nw_core::types::DEFAULT_PUBLISHER;
use nw_core::{Canonicalizer, InferenceModel, VectorIndex, DEFAULT_VECTOR_SIZE};
use nw_feed::{handle_command, load_feed, FeedSource, IngestArgs, IngestConfig, IngestManager};
use nw_inference::{create_model, EmbeddingClient, ModelKind};
use nw_query::{QueryConfig, QueryOrchestrator};
use nw_storage::{StorageConfig, StorageKind, DEFAULT_COLLECTION, DEFAULT_QDRANT_URL};
use nw_web::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let num = current_number
                    .parse::<u64>()
                    .map_err(|_| "Invalid number in duration".to_string())?;
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| "Duration is too large".to_string())?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing bare number counts as seconds
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(num)
                .ok_or_else(|| "Duration is too large".to_string())?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(name = "nw", author, version, about = "Answers questions about a news feed", long_about = None)]
pub struct Cli {
    /// Vector index backend: memory or qdrant
    #[arg(long, env = "NW_STORAGE", default_value = "memory")]
    storage: StorageKind,
    #[arg(long, env = "QDRANT_URL", default_value = DEFAULT_QDRANT_URL)]
    qdrant_url: String,
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    qdrant_api_key: Option<String>,
    #[arg(long, env = "COLLECTION_NAME", default_value = DEFAULT_COLLECTION)]
    collection: String,
    #[arg(long, env = "VECTOR_SIZE", default_value_t = DEFAULT_VECTOR_SIZE)]
    vector_size: usize,
    /// Model used for embeddings and answers. Available models: openai (default), dummy
    #[arg(long, env = "NW_MODEL", default_value = "openai")]
    model: ModelKind,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,
    #[arg(long, env = "OPENAI_BASE_URL", default_value = nw_inference::DEFAULT_BASE_URL)]
    openai_base_url: String,
    #[arg(long, env = "EMBEDDING_MODEL", default_value = nw_inference::DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,
    #[arg(long, env = "CHAT_MODEL", default_value = nw_inference::DEFAULT_CHAT_MODEL)]
    chat_model: String,
    /// Embedding call timeout (e.g. 30, 30s, 1m)
    #[arg(long, default_value = "30s")]
    embed_timeout: HumanDuration,
    #[arg(long, default_value = "10s")]
    search_timeout: HumanDuration,
    #[arg(long, default_value = "120s")]
    generation_timeout: HumanDuration,
    /// Articles retrieved per query
    #[arg(long, default_value_t = 3)]
    limit: usize,
    #[arg(long, default_value_t = 12_000)]
    max_context_chars: usize,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Feed loaded into the index before serving or querying.
#[derive(clap::Args, Debug, Clone)]
struct PreloadArgs {
    #[arg(long, env = "FEED_SOURCE")]
    feed: Option<FeedSource>,
    #[arg(long, env = "FEED_PUBLISHER", default_value = DEFAULT_PUBLISHER)]
    publisher: String,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Replace the collection with the contents of a feed
    Ingest(IngestArgs),
    /// Run the HTTP service
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        addr: SocketAddr,
        /// Directory with `.well-known/ai-plugin.json` and `openapi.yaml` for agent discovery
        #[arg(long, env = "MANIFEST_DIR")]
        manifest_dir: Option<PathBuf>,
        #[command(flatten)]
        preload: PreloadArgs,
    },
    /// Answer a single question and print the JSON response
    Query {
        q: String,
        #[command(flatten)]
        preload: PreloadArgs,
    },
}

impl Cli {
    fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            api_key: self.qdrant_api_key.clone(),
            vector_size: self.vector_size,
            timeout: self.search_timeout.0,
            ..StorageConfig::default()
        }
        .with_url(&self.qdrant_url)
        .with_collection(&self.collection)
    }

    fn inference_config(&self) -> nw_inference::Config {
        nw_inference::Config {
            api_key: self.openai_api_key.clone(),
            base_url: self.openai_base_url.clone(),
            embedding_model: self.embedding_model.clone(),
            chat_model: self.chat_model.clone(),
            dimension: self.vector_size,
            embed_timeout: self.embed_timeout.0,
            generation_timeout: self.generation_timeout.0,
        }
    }

    fn query_config(&self) -> QueryConfig {
        QueryConfig {
            limit: self.limit,
            max_context_chars: self.max_context_chars,
            embed_timeout: self.embed_timeout.0,
            search_timeout: self.search_timeout.0,
            generation_timeout: self.generation_timeout.0,
            ..QueryConfig::new(&self.collection)
        }
    }

    fn ingest_manager(
        &self,
        index: Arc<dyn VectorIndex>,
        model: Arc<dyn InferenceModel>,
        publisher: &str,
        config: IngestConfig,
    ) -> IngestManager {
        IngestManager::new(
            index,
            EmbeddingClient::new(model, self.embed_timeout.0),
            Canonicalizer::new(publisher),
            config,
        )
    }
}

async fn create_storage_with_retry(
    kind: StorageKind,
    config: &StorageConfig,
    max_retries: u32,
) -> nw_core::Result<Arc<dyn VectorIndex>> {
    let mut retries = 0;
    loop {
        match nw_storage::create_storage(kind, config).await {
            Ok(storage) => return Ok(storage),
            Err(e) if retries + 1 < max_retries => {
                retries += 1;
                info!("Storage initialization failed ({}), retrying {}/{}...", e, retries, max_retries - 1);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Ingests the preload feed, if any, and returns the local file to serve back.
async fn preload(
    cli: &Cli,
    args: &PreloadArgs,
    index: Arc<dyn VectorIndex>,
    model: Arc<dyn InferenceModel>,
) -> anyhow::Result<Option<PathBuf>> {
    let Some(source) = args.feed.as_ref() else {
        if cli.storage == StorageKind::Memory {
            warn!("⚠️ Using the memory backend without --feed; the index is empty");
            index
                .reset_collection(&cli.storage_config().collection_spec())
                .await
                .context("Failed to create the empty collection")?;
        }
        return Ok(None);
    };

    let items = load_feed(source)
        .await
        .with_context(|| format!("Failed to load feed {}", source))?;
    let manager = cli.ingest_manager(
        index,
        model,
        &args.publisher,
        IngestConfig::new(cli.storage_config().collection_spec()),
    );
    let report = manager.run(&items).await.context("Ingest failed")?;
    info!("📰 Preloaded {}/{} items", report.upserted, report.total);

    Ok(source.local_path().map(PathBuf::from))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    info!("💾 Connecting to storage...");
    let storage = create_storage_with_retry(cli.storage, &cli.storage_config(), 3)
        .await
        .context("Storage initialization failed")?;

    let model = create_model(cli.model, &cli.inference_config())
        .context("Inference model initialization failed")?;

    match &cli.command {
        Commands::Ingest(args) => {
            if cli.storage == StorageKind::Memory {
                warn!("⚠️ Ingesting into the memory backend; records are lost on exit");
            }
            let manager = cli.ingest_manager(
                storage.clone(),
                model.clone(),
                &args.publisher,
                args.ingest_config(cli.storage_config().collection_spec()),
            );
            let report = handle_command(args, &manager).await?;
            if report.total > 0 && report.upserted == 0 {
                bail!("None of the {} feed items could be embedded", report.total);
            }
        }
        Commands::Serve { addr, manifest_dir, preload: args } => {
            let feed_path = preload(&cli, args, storage.clone(), model.clone()).await?;
            let orchestrator = QueryOrchestrator::from_parts(model, storage, &cli.query_config());
            let state = AppState::new(Arc::new(orchestrator))
                .with_feed_path(feed_path)
                .with_manifest_dir(manifest_dir.clone());
            nw_web::serve(*addr, state).await?;
        }
        Commands::Query { q, preload: args } => {
            preload(&cli, args, storage.clone(), model.clone()).await?;
            let orchestrator = QueryOrchestrator::from_parts(model, storage, &cli.query_config());
            let response = orchestrator.answer(Some(q.as_str())).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        assert_eq!("30".parse::<HumanDuration>().unwrap().0, Duration::from_secs(30));
        assert_eq!("2m".parse::<HumanDuration>().unwrap().0, Duration::from_secs(120));
        assert_eq!("1h15m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(4530));
        assert!("".parse::<HumanDuration>().is_err());
        assert!("0s".parse::<HumanDuration>().is_err());
        assert!("5d".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_human_duration_overflow_is_an_error() {
        assert!("9999999999999999h".parse::<HumanDuration>().is_err());
        assert!("18446744073709551615s1s".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999".parse::<HumanDuration>().is_err());
    }

    #[tokio::test]
    async fn test_memory_backend_without_feed_answers_from_empty_index() {
        let cli = Cli::try_parse_from(["nw", "--model", "dummy", "--vector-size", "16", "query", "anything?"]).unwrap();
        let Commands::Query { preload: args, .. } = &cli.command else {
            panic!("expected the query command");
        };
        let args = PreloadArgs { feed: None, ..args.clone() };

        let index: Arc<dyn VectorIndex> = Arc::new(nw_storage::InMemoryStorage::new());
        let model: Arc<dyn InferenceModel> = Arc::new(nw_inference::models::DummyModel::new(16));
        let served = preload(&cli, &args, index.clone(), model.clone()).await.unwrap();
        assert!(served.is_none());

        let orchestrator = QueryOrchestrator::from_parts(model, index, &cli.query_config());
        let response = orchestrator.answer(Some("anything?")).await.unwrap();
        assert!(!response.answer.is_empty());
        assert!(response.source_data.is_empty());
    }

    #[test]
    fn test_query_config_from_flags() {
        let cli = Cli::try_parse_from([
            "nw",
            "--model",
            "dummy",
            "--limit",
            "5",
            "--search-timeout",
            "3",
            "query",
            "What happened in AI?",
        ])
        .unwrap();
        assert_eq!(cli.model, ModelKind::Dummy);

        let config = cli.query_config();
        assert_eq!(config.limit, 5);
        assert_eq!(config.search_timeout, Duration::from_secs(3));
        assert_eq!(config.generation_timeout, Duration::from_secs(120));
        assert!(matches!(cli.command, Commands::Query { ref q, .. } if q == "What happened in AI?"));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["nw", "--storage", "chroma", "serve"]).is_err());
    }

    #[test]
    fn test_serve_with_feed() {
        let cli = Cli::try_parse_from(["nw", "serve", "--feed", "news.xml", "--addr", "127.0.0.1:9000"]).unwrap();
        match cli.command {
            Commands::Serve { addr, manifest_dir, preload } => {
                assert_eq!(addr.port(), 9000);
                assert_eq!(manifest_dir, None);
                assert_eq!(preload.feed, Some(FeedSource::Path(PathBuf::from("news.xml"))));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
