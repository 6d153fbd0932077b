use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use search_core::dedup::deduplicate;
use search_core::{
    Config, Dictionary, DocId, InvertedIndex, JiebaTokenizer, KeywordRecommender, PageLib,
    ShardedLruCache, Tokenizer,
};
use search_server::{build_app, AppState, PageStore, DEFAULT_CACHE_CAPACITY};

#[derive(Parser)]
#[command(name = "search")]
#[command(about = "Offline-built, in-memory-served text search engine", long_about = None)]
struct Cli {
    /// Config file (key = value lines)
    #[arg(long, default_value = "conf/search.conf")]
    config: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the corpus, deduplicate, and write index, dictionary, and
    /// page library files
    Build,
    /// Serve queries with full page bodies in memory
    Server,
    /// Serve queries from metadata plus on-demand content reads
    ServerLite,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Build => build(&config),
        Commands::Server => serve(&config, false).await,
        Commands::ServerLite => serve(&config, true).await,
    }
}

fn build(config: &Config) -> Result<()> {
    let tokenizer = JiebaTokenizer::from_config(config);

    let data_path = config.get("data_path").context("data_path not configured")?;
    let mut pagelib = PageLib::new(data_path);
    let mut next_doc_id: DocId = 1;
    pagelib.load(&tokenizer, &mut next_doc_id)?;

    // the page library keeps every ingested page; only ranking structures
    // are built from the deduplicated subset
    if let Some(path) = config.get("pagelib_path") {
        pagelib.store(path)?;
        pagelib.store_separated(format!("{}.meta", path), format!("{}.content", path))?;
    } else {
        tracing::warn!("pagelib_path not configured; skipping page library output");
    }

    let pages = deduplicate(pagelib.into_pages());

    let mut index = InvertedIndex::default();
    index.build(&pages);
    if let Some(path) = config.get("index_path") {
        index.store(path)?;
    } else {
        tracing::warn!("index_path not configured; skipping index output");
    }

    let mut dictionary = Dictionary::default();
    dictionary.build(&pages);
    if let Some(path) = config.get("dict_path_output") {
        dictionary.store_dict(path)?;
    }
    if let Some(path) = config.get("dict_index_path") {
        dictionary.store_index(path)?;
    }

    tracing::info!("index build complete");
    Ok(())
}

async fn serve(config: &Config, lite: bool) -> Result<()> {
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(JiebaTokenizer::from_config(config));

    let index = match config.get("index_path") {
        Some(path) => match InvertedIndex::load(path) {
            Ok(index) => index,
            Err(err) => {
                tracing::error!(path, %err, "failed to load index; serving empty results");
                InvertedIndex::default()
            }
        },
        None => {
            tracing::error!("index_path not configured; serving empty results");
            InvertedIndex::default()
        }
    };

    let pages = match config.get("pagelib_path") {
        Some(path) => {
            let meta_path = format!("{}.meta", path);
            let content_path = format!("{}.content", path);
            let meta = match PageLib::load_meta(&meta_path) {
                Ok(meta) => meta,
                Err(err) => {
                    tracing::error!(path = %meta_path, %err,
                        "failed to load page metadata; results will carry placeholders");
                    Default::default()
                }
            };
            if lite {
                PageStore::lite(meta, &content_path)
            } else {
                PageStore::full(meta, &content_path)
            }
        }
        None => {
            tracing::error!("pagelib_path not configured; results will carry placeholders");
            PageStore::lite(Default::default(), "")
        }
    };

    let recommender = load_recommender(config);

    let cache_capacity = config
        .get("cache_size")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_CACHE_CAPACITY);

    let state = AppState {
        index: Arc::new(index),
        tokenizer,
        pages: Arc::new(pages),
        recommender,
        cache: Arc::new(ShardedLruCache::new(cache_capacity)),
    };
    let app = build_app(state);

    let ip = config.get("server_ip").unwrap_or("0.0.0.0");
    let port = config
        .get("server_port")
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", ip, port)
        .parse()
        .with_context(|| format!("invalid server address {}:{}", ip, port))?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, lite, cache_capacity, "search server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped gracefully");
    Ok(())
}

fn load_recommender(config: &Config) -> Option<Arc<KeywordRecommender>> {
    let dict_path = config.get("dict_path_output")?;
    let mut dictionary = match Dictionary::load_dict(dict_path) {
        Ok(dict) => dict,
        Err(err) => {
            tracing::error!(path = dict_path, %err, "failed to load dictionary; suggestions disabled");
            return None;
        }
    };
    if let Some(index_path) = config.get("dict_index_path") {
        if let Err(err) = dictionary.load_index(index_path) {
            tracing::error!(path = index_path, %err, "failed to load character index");
        }
    }
    tracing::info!(words = dictionary.len(), "keyword recommender enabled");
    Some(Arc::new(KeywordRecommender::new(Arc::new(dictionary))))
}

/// Resolves on ctrl-c or SIGTERM; axum then stops accepting and drains
/// in-flight requests.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(%err, "failed to install SIGTERM handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
