use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, HeaderValue, StatusCode}, routing::{get, post}, Json, Router};
use minisearch_core::persist::{load_corpus, load_or_compute_ranks, IndexPaths};
use minisearch_core::{lookup_term, search, InvertedIndex, Page, PageTable, RankTable, SearchError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub url: String,
    pub score: f64,
    pub page_rank: f64,
}

#[derive(Serialize)]
pub struct TermResponse {
    pub term: String,
    pub pages: Vec<TermPosting>,
}

#[derive(Serialize)]
pub struct TermPosting {
    pub url: String,
    pub count: usize,
    pub positions: Vec<usize>,
}

#[derive(Deserialize)]
pub struct PageParams {
    pub url: String,
}

#[derive(Serialize)]
pub struct PageResponse {
    pub url: String,
    pub page_rank: Option<f64>,
    #[serde(flatten)]
    pub page: Page,
}

/// Read-only search data, swapped wholesale on reload.
pub struct Corpus {
    pub index: InvertedIndex,
    pub pages: PageTable,
    pub ranks: RankTable,
}

impl Corpus {
    pub fn load(paths: &IndexPaths) -> Result<Self> {
        let (index, pages) = load_corpus(paths)?;
        let ranks = load_or_compute_ranks(paths, &pages)?;
        tracing::info!(pages = pages.len(), terms = index.len(), "corpus loaded");
        Ok(Self { index, pages, ranks })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths: IndexPaths,
    pub corpus: Arc<RwLock<Corpus>>,
    pub admin_token: Option<String>,
}

/// Where the index lives and who may touch it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub index_dir: PathBuf,
    /// Token expected in `X-ADMIN-TOKEN`; reload is refused while unset.
    pub admin_token: Option<String>,
    /// Allowed CORS origins; empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self { index_dir: index_dir.into(), admin_token: None, allowed_origins: Vec::new() }
    }

    /// `ADMIN_TOKEN` and the comma-separated `CORS_ALLOW_ORIGIN` from the environment.
    pub fn from_env(index_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(index_dir);
        config.admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());
        if let Ok(origins) = std::env::var("CORS_ALLOW_ORIGIN") {
            config.allowed_origins = origins.split(',').map(str::trim).filter(|o| !o.is_empty()).map(str::to_string).collect();
        }
        config
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    let allow = if parsed.is_empty() { AllowOrigin::any() } else { AllowOrigin::list(parsed) };
    CorsLayer::new().allow_origin(allow).allow_methods(Any).allow_headers(Any)
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let index_paths = IndexPaths::new(&config.index_dir);
    let corpus = Corpus::load(&index_paths)?;
    let cors = cors_layer(&config.allowed_origins);
    let app_state = AppState { index_paths, corpus: Arc::new(RwLock::new(corpus)), admin_token: config.admin_token };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/term/:term", get(term_handler))
        .route("/page", get(page_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let corpus = state.corpus.read();
    let hits = match search(&params.q, &corpus.index, &corpus.pages, &corpus.ranks) {
        Ok(hits) => hits,
        Err(SearchError::EmptyQuery) => return Err((StatusCode::BAD_REQUEST, "query has no searchable terms".into())),
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };
    let total_hits = hits.len();
    let k = params.k.clamp(1, 100);
    let results = hits
        .into_iter()
        .take(k)
        .map(|h| SearchHit { page_rank: corpus.ranks.get(&h.url).copied().unwrap_or(0.0), url: h.url, score: h.score })
        .collect();
    Ok(Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, results }))
}

pub async fn term_handler(State(state): State<AppState>, Path(term): Path<String>) -> Result<Json<TermResponse>, (StatusCode, String)> {
    let corpus = state.corpus.read();
    let postings = lookup_term(&term, &corpus.index).map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;
    let pages = postings
        .iter()
        .map(|(url, positions)| TermPosting { url: url.clone(), count: positions.len(), positions: positions.clone() })
        .collect();
    Ok(Json(TermResponse { term, pages }))
}

pub async fn page_handler(State(state): State<AppState>, Query(params): Query<PageParams>) -> Result<Json<PageResponse>, (StatusCode, String)> {
    let corpus = state.corpus.read();
    let page = corpus.pages.get(&params.url).ok_or((StatusCode::NOT_FOUND, "not found".to_string()))?;
    Ok(Json(PageResponse { page_rank: corpus.ranks.get(&params.url).copied(), page: page.clone(), url: params.url }))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let fresh = Corpus::load(&state.index_paths).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    let (pages, terms) = (fresh.pages.len(), fresh.index.len());
    *state.corpus.write() = fresh;
    Ok(Json(serde_json::json!({ "pages": pages, "terms": terms })))
}

const ADMIN_HEADER: &str = "X-ADMIN-TOKEN";

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let Some(required) = state.admin_token.as_deref() else {
        tracing::warn!("reload refused: no admin token configured");
        return Err((StatusCode::UNAUTHORIZED, "admin token not configured".into()));
    };
    match headers.get(ADMIN_HEADER).map(HeaderValue::to_str) {
        Some(Ok(provided)) if provided == required => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, "invalid admin token".into())),
    }
}
