use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use search_core::charsplit::sanitize_utf8;
use search_core::index::DEFAULT_TOP_K;
use search_core::snippet::{self, MAX_SUMMARY_CHARS};
use search_core::{
    ContentStore, DocId, InvertedIndex, KeywordRecommender, ShardedLruCache, Tokenizer,
    WebPageMeta,
};

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

const SUGGEST_TOP_K: usize = 5;
const SUGGEST_MAX_DISTANCE: usize = 2;

/// A page body held fully in memory (traditional serve mode).
pub struct StoredPage {
    pub title: String,
    pub url: String,
    pub content: Vec<u8>,
}

/// Where result enrichment comes from: either full bodies in memory, or
/// metadata plus ranged reads against the on-disk content file.
pub enum PageStore {
    Full(HashMap<DocId, StoredPage>),
    Lite { meta: HashMap<DocId, WebPageMeta>, content: ContentStore },
}

impl PageStore {
    /// Traditional mode: slurp the content file once and slice each page's
    /// body out of it.
    pub fn full<P: AsRef<Path>>(meta: HashMap<DocId, WebPageMeta>, content_path: P) -> Self {
        let bytes = match fs::read(content_path.as_ref()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(path = %content_path.as_ref().display(), %err,
                    "cannot read content file; serving without page bodies");
                Vec::new()
            }
        };

        let total = bytes.len() as u64;
        let pages = meta
            .into_values()
            .map(|m| {
                let start = m.content_offset.min(total) as usize;
                let end = (m.content_offset + m.content_length).min(total) as usize;
                let page = StoredPage {
                    title: m.title,
                    url: m.url,
                    content: bytes[start..end].to_vec(),
                };
                (m.doc_id, page)
            })
            .collect();

        tracing::info!(bytes = total, "loaded full page bodies");
        Self::Full(pages)
    }

    /// Memory-optimized mode: keep metadata only and read bodies on demand.
    pub fn lite<P: AsRef<Path>>(meta: HashMap<DocId, WebPageMeta>, content_path: P) -> Self {
        Self::Lite { meta, content: ContentStore::new(content_path) }
    }

    /// Title, url, and query-aware summary for one hit. Unknown ids get a
    /// placeholder title rather than an error.
    fn enrich(&self, doc_id: DocId, query_words: &[String]) -> (String, String, String) {
        match self {
            Self::Full(pages) => match pages.get(&doc_id) {
                Some(page) => (
                    sanitize_utf8(page.title.as_bytes()),
                    sanitize_utf8(page.url.as_bytes()),
                    snippet::extract(&page.content, query_words, MAX_SUMMARY_CHARS),
                ),
                None => placeholder(doc_id),
            },
            Self::Lite { meta, content } => match meta.get(&doc_id) {
                Some(m) => (
                    sanitize_utf8(m.title.as_bytes()),
                    sanitize_utf8(m.url.as_bytes()),
                    content.get_summary(
                        m.content_offset,
                        m.content_length,
                        query_words,
                        MAX_SUMMARY_CHARS,
                    ),
                ),
                None => placeholder(doc_id),
            },
        }
    }
}

fn placeholder(doc_id: DocId) -> (String, String, String) {
    (format!("Document {}", doc_id), String::new(), String::new())
}

/// Shared request state. Everything except the cache is immutable after
/// startup and shared by reference across handlers.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<InvertedIndex>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub pages: Arc<PageStore>,
    pub recommender: Option<Arc<KeywordRecommender>>,
    pub cache: Arc<ShardedLruCache<String, String>>,
}

#[derive(Serialize)]
struct SearchHit {
    #[serde(rename = "docId")]
    doc_id: DocId,
    score: f64,
    title: String,
    url: String,
    summary: String,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    total: usize,
    results: Vec<SearchHit>,
}

#[derive(Serialize)]
struct SuggestResponse {
    query: String,
    suggestions: Vec<String>,
}

impl AppState {
    /// Cache-through search: tokenize, rank, enrich each hit, serialize.
    /// The response is a pure function of the query and the loaded index,
    /// so concurrent misses for the same query racing on the cache are
    /// benign.
    pub fn handle_search(&self, query: &str) -> String {
        let key = query.to_string();
        if let Some(cached) = self.cache.get(&key) {
            self.cache.record_query(true);
            return cached;
        }
        self.cache.record_query(false);

        let query_words = self.tokenizer.cut(query);
        let ranked = self.index.search(&query_words, DEFAULT_TOP_K);

        let results: Vec<SearchHit> = ranked
            .iter()
            .take(DEFAULT_TOP_K)
            .map(|&(doc_id, score)| {
                let (title, url, summary) = self.pages.enrich(doc_id, &query_words);
                SearchHit { doc_id, score, title, url, summary }
            })
            .collect();

        let response = SearchResponse {
            query: sanitize_utf8(query.as_bytes()),
            total: ranked.len(),
            results,
        };
        let json = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
        self.cache.put(key, json.clone());
        json
    }

    pub fn handle_suggest(&self, query: &str) -> String {
        let suggestions = match &self.recommender {
            Some(recommender) => recommender.recommend(query, SUGGEST_TOP_K, SUGGEST_MAX_DISTANCE),
            None => Vec::new(),
        };
        let response =
            SuggestResponse { query: sanitize_utf8(query.as_bytes()), suggestions };
        serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/search", get(search_handler))
        .route("/suggest", get(suggest_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any))
}

fn json_body(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json; charset=utf-8")], body)
}

fn missing_query() -> String {
    serde_json::json!({ "error": "Missing query parameter 'q'" }).to_string()
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match params.get("q").filter(|q| !q.is_empty()) {
        Some(q) => json_body(state.handle_search(q)),
        None => json_body(missing_query()),
    }
}

async fn suggest_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match params.get("q").filter(|q| !q.is_empty()) {
        Some(q) => json_body(state.handle_suggest(q)),
        None => json_body(missing_query()),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = serde_json::json!({
        "status": "ok",
        "cache_size": state.cache.len(),
        "cache_hit_rate": state.cache.hit_rate(),
    });
    json_body(health.to_string())
}
