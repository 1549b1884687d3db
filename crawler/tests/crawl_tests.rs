use anyhow::{anyhow, Result};
use crawler::{CrawlConfig, CrawlError, Crawler, Fetcher, HtmlExtractor, TraversalOrder};
use minisearch_core::persist::{load_corpus, IndexPaths};
use minisearch_core::PageTable;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const ROOT: &str = "http://site.test/";

/// In-memory site that records every fetch it serves.
struct SiteFetcher {
    pages: HashMap<String, String>,
    log: Mutex<Vec<(String, Instant)>>,
    failures_left: Mutex<u32>,
}

impl SiteFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        let pages = pages
            .iter()
            .map(|(path, body)| (format!("http://site.test{path}"), format!("<html><body>{body}</body></html>")))
            .collect();
        Self { pages, log: Mutex::new(Vec::new()), failures_left: Mutex::new(0) }
    }

    fn failing_first(self, n: u32) -> Self {
        *self.failures_left.lock().unwrap() = n;
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(u, _)| u.trim_start_matches("http://site.test").to_string()).collect()
    }

    fn starts(&self) -> Vec<Instant> {
        self.log.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

impl Fetcher for &SiteFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.log.lock().unwrap().push((url.to_string(), Instant::now()));
        {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(anyhow!("connection reset"));
            }
        }
        self.pages.get(url).cloned().ok_or_else(|| anyhow!("HTTP 404 Not Found"))
    }
}

fn site() -> SiteFetcher {
    SiteFetcher::new(&[
        ("/", r#"<p>Welcome to the quotes.</p><a href="/a">a</a><a href="/b">b</a><a href="https://other.test/x">x</a>"#),
        ("/a", r#"<p>Imagination is more important than knowledge.</p><a href="/b">b</a><a href="/">home</a><a href="/a#top">top</a>"#),
        ("/b", r#"<p>Knowledge speaks, wisdom listens.</p><a href="/c">c</a>"#),
        ("/c", r#"<p>Wisdom begins in wonder.</p><a href="/">home</a>"#),
    ])
}

fn config(order: TraversalOrder) -> CrawlConfig {
    let mut config = CrawlConfig::new(ROOT);
    config.politeness = Duration::ZERO;
    config.order = order;
    config
}

async fn run(fetcher: &SiteFetcher, config: CrawlConfig) -> Result<crawler::CrawlState, CrawlError> {
    let crawler = Crawler::new(config, fetcher, HtmlExtractor::new("body").unwrap());
    crawler.crawl().await
}

fn assert_incoming_matches_outgoing(pages: &PageTable) {
    for (url, page) in pages {
        let referrers: BTreeSet<String> = pages
            .iter()
            .filter(|(_, p)| p.visited && p.outgoing.as_ref().is_some_and(|o| o.contains(url)))
            .map(|(u, _)| u.clone())
            .collect();
        assert_eq!(page.incoming, referrers, "incoming of {url}");
    }
}

#[tokio::test]
async fn depth_first_visits_each_page_once() {
    let fetcher = site();
    let state = run(&fetcher, config(TraversalOrder::DepthFirst)).await.unwrap();
    assert_eq!(fetcher.fetched(), vec!["/", "/b", "/c", "/a"]);
    assert_eq!(state.visited, 4);
    assert!(state.pages.values().all(|p| p.visited));
    assert!(!state.pages.contains_key("https://other.test/x"));
    assert_incoming_matches_outgoing(&state.pages);
}

#[tokio::test]
async fn breadth_first_visits_in_discovery_order() {
    let fetcher = site();
    let state = run(&fetcher, config(TraversalOrder::BreadthFirst)).await.unwrap();
    assert_eq!(fetcher.fetched(), vec!["/", "/a", "/b", "/c"]);
    assert_incoming_matches_outgoing(&state.pages);
}

#[tokio::test]
async fn builds_index_and_link_sets() {
    let fetcher = site();
    let state = run(&fetcher, config(TraversalOrder::DepthFirst)).await.unwrap();
    let a = &state.pages["http://site.test/a"];
    let expected: BTreeSet<String> = ["http://site.test/", "http://site.test/a", "http://site.test/b"].iter().map(|s| s.to_string()).collect();
    assert_eq!(a.outgoing.as_ref(), Some(&expected));
    assert!(a.token_count.is_some_and(|c| c > 0));

    let wisdom = state.index.get("wisdom").unwrap();
    assert_eq!(wisdom.keys().cloned().collect::<Vec<_>>(), vec!["http://site.test/b", "http://site.test/c"]);
    assert!(state.index.get("the").is_none());
}

#[tokio::test]
async fn fetch_failure_aborts_the_run() {
    let fetcher = SiteFetcher::new(&[("/", r#"<a href="/missing">gone</a>"#)]);
    let err = run(&fetcher, config(TraversalOrder::DepthFirst)).await.unwrap_err();
    match err {
        CrawlError::Fetch { url, attempts, .. } => {
            assert_eq!(url, "http://site.test/missing");
            assert_eq!(attempts, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn bounded_retries_recover_from_transient_failures() {
    let fetcher = site().failing_first(2);
    let mut cfg = config(TraversalOrder::DepthFirst);
    cfg.max_retries = 2;
    cfg.retry_base = Duration::from_millis(1);
    let state = run(&fetcher, cfg).await.unwrap();
    assert_eq!(state.visited, 4);
    assert_eq!(fetcher.fetched().len(), 6);

    let fetcher = site().failing_first(3);
    let mut cfg = config(TraversalOrder::DepthFirst);
    cfg.max_retries = 2;
    cfg.retry_base = Duration::from_millis(1);
    assert!(matches!(run(&fetcher, cfg).await, Err(CrawlError::Fetch { attempts: 3, .. })));
}

#[tokio::test]
async fn consecutive_fetch_starts_respect_politeness() {
    let fetcher = site();
    let mut cfg = config(TraversalOrder::DepthFirst);
    cfg.politeness = Duration::from_millis(100);
    run(&fetcher, cfg).await.unwrap();
    let starts = fetcher.starts();
    assert_eq!(starts.len(), 4);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(50));
    }
}

#[tokio::test]
async fn page_cap_leaves_remaining_pages_discovered() {
    let fetcher = site();
    let mut cfg = config(TraversalOrder::BreadthFirst);
    cfg.max_pages = Some(2);
    let state = run(&fetcher, cfg).await.unwrap();
    assert_eq!(state.visited, 2);
    assert!(!state.frontier.is_empty());
    assert!(!state.pages["http://site.test/b"].visited);
}

#[tokio::test]
async fn checkpoint_matches_final_state() {
    let dir = tempdir().unwrap();
    let fetcher = site();
    let mut cfg = config(TraversalOrder::DepthFirst);
    cfg.checkpoint_dir = Some(dir.path().to_path_buf());
    let state = run(&fetcher, cfg).await.unwrap();
    let (index, pages) = load_corpus(&IndexPaths::new(dir.path())).unwrap();
    assert_eq!(index, state.index);
    assert_eq!(pages, state.pages);
}

#[tokio::test]
async fn invalid_seed_is_rejected() {
    let fetcher = site();
    let cfg = CrawlConfig::new("not a url");
    assert!(matches!(run(&fetcher, cfg).await, Err(CrawlError::InvalidUrl { .. })));
}

#[tokio::test]
async fn single_page_crawl_ranks_and_answers_queries() {
    use minisearch_core::rank::rank;
    use minisearch_core::{search, RankConfig};

    let fetcher = SiteFetcher::new(&[("/", "the cat sat on the mat the cat ran")]);
    let (index, pages) = run(&fetcher, config(TraversalOrder::DepthFirst)).await.unwrap().into_parts();
    assert_eq!(pages.len(), 1);
    let page = &pages[ROOT];
    assert_eq!(page.token_count, Some(9));
    assert_eq!(index.get("cat").unwrap()[ROOT], vec![1, 7]);
    assert_eq!(index.len(), 4);

    let ranks = rank(&pages, &RankConfig::default()).unwrap();
    assert!((ranks[ROOT] - 1.0).abs() < 1e-12);

    let hits = search("cat mat", &index, &pages, &ranks).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, ROOT);
    assert!(search("unicorn", &index, &pages, &ranks).unwrap().is_empty());
}
