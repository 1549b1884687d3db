pub mod config;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod politeness;

use minisearch_core::index::{index_page, InvertedIndex, Page, PageTable};
use minisearch_core::persist::{save_checkpoint, IndexPaths};
use minisearch_core::tokenizer::Tokenized;
use minisearch_core::tokenize;
use std::collections::BTreeSet;
use thiserror::Error;
use tokio::time::sleep;
use url::Url;

pub use config::{CrawlConfig, TraversalOrder};
pub use extract::{Extracted, Extractor, HtmlExtractor};
pub use fetch::{Fetcher, HttpFetcher};
pub use frontier::Frontier;
use politeness::{Pacer, RetryBackoff};

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("fetching {url} failed after {attempts} attempt(s): {reason}")]
    Fetch { url: String, attempts: u32, reason: String },

    #[error("invalid content selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("checkpoint failed: {0:#}")]
    Checkpoint(anyhow::Error),
}

/// Everything a crawl builds: the index, the link graph and the pending frontier.
#[derive(Debug)]
pub struct CrawlState {
    pub index: InvertedIndex,
    pub pages: PageTable,
    pub frontier: Frontier,
    pub visited: usize,
}

impl CrawlState {
    pub fn new(seed: &str, order: TraversalOrder) -> Self {
        let mut pages = PageTable::new();
        pages.insert(seed.to_string(), Page::discovered());
        let mut frontier = Frontier::new(order);
        frontier.push(seed.to_string());
        Self { index: InvertedIndex::new(), pages, frontier, visited: 0 }
    }

    /// Record a fetched page: index its terms, set its outgoing links, and register it
    /// as a referrer of every target. Targets not yet in the page table are queued.
    /// Returns the newly discovered URLs.
    pub fn record_visit(&mut self, url: &str, tokenized: &Tokenized, outgoing: BTreeSet<String>) -> Vec<String> {
        index_page(&mut self.index, &tokenized.postings, url);

        let mut discovered = Vec::new();
        for target in &outgoing {
            match self.pages.get_mut(target) {
                Some(page) => {
                    page.incoming.insert(url.to_string());
                }
                None => {
                    self.pages.insert(target.clone(), Page::discovered_from(url));
                    self.frontier.push(target.clone());
                    discovered.push(target.clone());
                }
            }
        }

        let page = self.pages.entry(url.to_string()).or_default();
        page.visited = true;
        page.token_count = Some(tokenized.token_count);
        page.outgoing = Some(outgoing);
        self.visited += 1;
        discovered
    }

    pub fn into_parts(self) -> (InvertedIndex, PageTable) {
        (self.index, self.pages)
    }
}

pub struct Crawler<F, E> {
    config: CrawlConfig,
    fetcher: F,
    extractor: E,
}

impl Crawler<HttpFetcher, HtmlExtractor> {
    /// Crawler backed by HTTP fetches and HTML extraction.
    pub fn http(config: CrawlConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        let extractor = HtmlExtractor::new(&config.content_selector)?;
        Ok(Self::new(config, fetcher, extractor))
    }
}

impl<F: Fetcher, E: Extractor> Crawler<F, E> {
    pub fn new(config: CrawlConfig, fetcher: F, extractor: E) -> Self {
        Self { config, fetcher, extractor }
    }

    /// Crawl from the seed until the frontier is empty (or the page cap is hit).
    /// Any fetch that still fails after the configured retries aborts the run.
    pub async fn crawl(&self) -> Result<CrawlState, CrawlError> {
        let base = Url::parse(&self.config.seed).map_err(|e| CrawlError::InvalidUrl {
            url: self.config.seed.clone(),
            reason: e.to_string(),
        })?;
        let seed = extract::normalize(&base);
        let checkpoints = self.config.checkpoint_dir.as_ref().map(IndexPaths::new);
        let mut state = CrawlState::new(&seed, self.config.order);
        let mut pacer = Pacer::new(self.config.politeness);
        tracing::info!(seed = %seed, order = ?self.config.order, "crawl started");

        while !state.frontier.is_empty() {
            if self.config.max_pages.is_some_and(|cap| state.visited >= cap) {
                tracing::warn!(visited = state.visited, remaining = state.frontier.len(), "page cap reached");
                break;
            }
            let Some(current) = state.frontier.pop() else { break };
            let page_url = Url::parse(&current).map_err(|e| CrawlError::InvalidUrl {
                url: current.clone(),
                reason: e.to_string(),
            })?;

            let raw = self.fetch_with_retries(&current, &mut pacer).await?;
            let extracted = self.extractor.extract(&raw);
            let tokenized = tokenize(&extracted.text);
            let outgoing = extract::resolve_links(&base, &page_url, &extracted.hrefs);
            let discovered = state.record_visit(&current, &tokenized, outgoing);

            if !discovered.is_empty() {
                tracing::info!(url = %current, new = discovered.len(), "new pages discovered");
                for link in &discovered {
                    tracing::debug!(link = %link, "discovered");
                }
            }
            tracing::info!(remaining = state.frontier.len(), "urls remaining");

            if let Some(paths) = &checkpoints {
                save_checkpoint(paths, &seed, &state.index, &state.pages).map_err(CrawlError::Checkpoint)?;
            }
        }

        tracing::info!(visited = state.visited, pages = state.pages.len(), terms = state.index.len(), "crawl finished");
        Ok(state)
    }

    async fn fetch_with_retries(&self, url: &str, pacer: &mut Pacer) -> Result<String, CrawlError> {
        let backoff = RetryBackoff::new(self.config.retry_base, self.config.retry_max);
        let mut attempt = 0u32;
        loop {
            pacer.ready().await;
            tracing::info!(url, attempt, "fetching");
            match self.fetcher.fetch(url).await {
                Ok(raw) => return Ok(raw),
                Err(e) if attempt < self.config.max_retries => {
                    let delay = backoff.delay(attempt);
                    tracing::warn!(url, attempt, error = %e, delay_ms = delay.as_millis() as u64, "fetch failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(url, error = %e, "fetch failed");
                    return Err(CrawlError::Fetch { url: url.to_string(), attempts: attempt + 1, reason: format!("{e:#}") });
                }
            }
        }
    }
}
