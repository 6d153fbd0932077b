//! Offline-built, in-memory-served text search engine core: corpus ingest
//! and near-duplicate removal, a BM25 inverted index, a dictionary-backed
//! keyword recommender, a ranged content store for snippets, and the
//! sharded query cache. The HTTP surface lives in the server crate.

pub mod cache;
pub mod charsplit;
pub mod config;
pub mod content;
pub mod dedup;
pub mod dict;
pub mod document;
pub mod index;
pub mod pagelib;
pub mod recommend;
pub mod simhash;
pub mod snippet;
pub mod tokenizer;

/// Dense, monotonic document id assigned in ingest order. The first
/// ingested document gets id 1.
pub type DocId = i32;

pub use cache::ShardedLruCache;
pub use config::Config;
pub use content::ContentStore;
pub use dict::Dictionary;
pub use document::Document;
pub use index::{InvertedIndex, PostingEntry};
pub use pagelib::{PageLib, WebPageMeta};
pub use recommend::KeywordRecommender;
pub use tokenizer::{JiebaTokenizer, Tokenizer};
