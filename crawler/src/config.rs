use std::path::PathBuf;
use std::time::Duration;

/// Order in which queued URLs are taken off the frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Most recently discovered first (stack).
    #[default]
    DepthFirst,
    /// Oldest discovered first (queue).
    BreadthFirst,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed: String,
    /// Minimum time between the starts of two consecutive fetches.
    pub politeness: Duration,
    pub order: TraversalOrder,
    /// Extra attempts after a failed fetch. Zero aborts on the first failure.
    pub max_retries: u32,
    pub retry_base: Duration,
    pub retry_max: Duration,
    /// Stop after this many pages even if the frontier is not empty.
    pub max_pages: Option<usize>,
    /// Directory that receives a full snapshot after every page.
    pub checkpoint_dir: Option<PathBuf>,
    /// CSS selector for the blocks whose text gets indexed.
    pub content_selector: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl CrawlConfig {
    pub const DEFAULT_POLITENESS_SECS: u64 = 6;
    pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            politeness: Duration::from_secs(Self::DEFAULT_POLITENESS_SECS),
            order: TraversalOrder::DepthFirst,
            max_retries: 0,
            retry_base: Duration::from_millis(500),
            retry_max: Duration::from_secs(30),
            max_pages: None,
            checkpoint_dir: None,
            content_selector: "body".to_string(),
            timeout: Duration::from_secs(12),
            user_agent: "minisearch-bot/0.1 (+https://example.com/bot)".to_string(),
        }
    }
}
