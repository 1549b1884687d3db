mod command;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use command::Command;
use crawler::{CrawlConfig, Crawler, TraversalOrder};
use minisearch_core::persist::{load_corpus, load_or_compute_ranks, save_checkpoint, save_ranks, IndexPaths};
use minisearch_core::rank::rank;
use minisearch_core::{lookup_term, search, DanglingPolicy, InvertedIndex, PageTable, RankConfig, RankTable, SearchError};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Crawl a site, rank its pages and query the resulting index", long_about = None)]
struct Cli {
    /// Index directory
    #[arg(long, global = true, default_value = "./index")]
    index_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from a seed URL, checkpointing the index after every page, then rank
    Build {
        /// Seed URL; only links on its origin are followed
        #[arg(long)]
        seed: String,
        /// Minimum seconds between fetch starts
        #[arg(long, default_value_t = CrawlConfig::DEFAULT_POLITENESS_SECS as f64)]
        politeness_secs: f64,
        #[arg(long, value_enum, default_value_t = OrderArg::Depth)]
        order: OrderArg,
        /// Extra attempts per failed fetch before the crawl aborts
        #[arg(long, default_value_t = 0)]
        max_retries: u32,
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
        /// CSS selector for the blocks whose text is indexed
        #[arg(long, default_value = "body")]
        selector: String,
        /// Request timeout seconds
        #[arg(long, default_value_t = 12)]
        timeout_secs: u64,
        #[command(flatten)]
        rank: RankArgs,
    },
    /// Recompute PageRank from the stored link graph
    Rank {
        #[command(flatten)]
        rank: RankArgs,
    },
    /// Print the posting list for a term
    Lookup { term: String },
    /// Run a free-text query
    Find {
        #[arg(required = true)]
        query: Vec<String>,
        /// Number of results to show
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Emit JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Interactive prompt: lookup <term>, find <query>, exit
    Shell {
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Depth,
    Breadth,
}

#[derive(Clone, Copy, ValueEnum)]
enum DanglingArg {
    Ignore,
    Redistribute,
    Reject,
}

#[derive(clap::Args)]
struct RankArgs {
    #[arg(long, default_value_t = 0.85)]
    damping: f64,
    #[arg(long, default_value_t = 1e-6)]
    epsilon: f64,
    #[arg(long, default_value_t = 1000)]
    max_iterations: usize,
    /// Handling of pages without outgoing links
    #[arg(long, value_enum, default_value_t = DanglingArg::Ignore)]
    dangling: DanglingArg,
}

impl RankArgs {
    fn config(&self) -> RankConfig {
        let dangling = match self.dangling {
            DanglingArg::Ignore => DanglingPolicy::Ignore,
            DanglingArg::Redistribute => DanglingPolicy::Redistribute,
            DanglingArg::Reject => DanglingPolicy::Reject,
        };
        RankConfig { damping: self.damping, epsilon: self.epsilon, max_iterations: self.max_iterations, dangling }
    }
}

/// Everything a query needs, loaded once from the index directory.
struct Session {
    index: InvertedIndex,
    pages: PageTable,
    ranks: RankTable,
}

impl Session {
    fn open(paths: &IndexPaths) -> Result<Self> {
        let (index, pages) = load_corpus(paths)?;
        let ranks = load_or_compute_ranks(paths, &pages)?;
        Ok(Self { index, pages, ranks })
    }

    fn lookup(&self, term: &str) {
        match lookup_term(term, &self.index) {
            Ok(postings) => {
                println!("Inverted index entry for '{term}':");
                for (url, positions) in postings {
                    println!("  {url}  count={}  positions={positions:?}", positions.len());
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    fn find(&self, query: &str, top: usize, json: bool) -> Result<()> {
        let hits = match search(query, &self.index, &self.pages, &self.ranks) {
            Ok(hits) => hits,
            Err(SearchError::EmptyQuery) => {
                println!("Query '{query}' has no searchable terms.");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if json {
            #[derive(Serialize)]
            struct Out<'a> { query: &'a str, total_hits: usize, results: &'a [minisearch_core::SearchHit] }
            let shown = &hits[..hits.len().min(top)];
            println!("{}", serde_json::to_string_pretty(&Out { query, total_hits: hits.len(), results: shown })?);
            return Ok(());
        }
        if hits.is_empty() {
            println!("No results found for '{query}'.");
            return Ok(());
        }
        println!("{} results found for '{query}':", hits.len());
        for (i, hit) in hits.iter().take(top).enumerate() {
            println!("  {:>3}. [{:.4}] {}", i + 1, hit.score, hit.url);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let paths = IndexPaths::new(&cli.index_dir);

    match cli.command {
        Commands::Build { seed, politeness_secs, order, max_retries, max_pages, selector, timeout_secs, rank: rank_args } => {
            let mut config = CrawlConfig::new(seed);
            config.politeness = politeness_interval(politeness_secs)?;
            config.order = match order {
                OrderArg::Depth => TraversalOrder::DepthFirst,
                OrderArg::Breadth => TraversalOrder::BreadthFirst,
            };
            config.max_retries = max_retries;
            config.max_pages = max_pages;
            config.content_selector = selector;
            config.timeout = Duration::from_secs(timeout_secs);
            config.checkpoint_dir = Some(cli.index_dir.clone());
            build(config, &paths, &rank_args.config()).await
        }
        Commands::Rank { rank: rank_args } => {
            let (_, pages) = load_corpus(&paths)?;
            let ranks = rank(&pages, &rank_args.config())?;
            save_ranks(&paths, &ranks)?;
            tracing::info!(pages = ranks.len(), "ranks saved");
            Ok(())
        }
        Commands::Lookup { term } => {
            Session::open(&paths)?.lookup(&term);
            Ok(())
        }
        Commands::Find { query, top, json } => Session::open(&paths)?.find(&query.join(" "), top, json),
        Commands::Shell { top } => shell(&Session::open(&paths)?, top),
    }
}

/// Seconds from the command line as a pacing interval; negative, NaN and
/// out-of-range values are rejected instead of clamped.
fn politeness_interval(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| anyhow!("invalid --politeness-secs {secs}: {e}"))
}

async fn build(config: CrawlConfig, paths: &IndexPaths, rank_config: &RankConfig) -> Result<()> {
    let seed = config.seed.clone();
    let crawler = Crawler::http(config)?;
    let (index, pages) = crawler.crawl().await?.into_parts();
    // The crawl checkpoints after every page; this covers a seed-only run with no pages.
    save_checkpoint(paths, &seed, &index, &pages)?;
    let ranks = rank(&pages, rank_config)?;
    save_ranks(paths, &ranks)?;
    tracing::info!(pages = pages.len(), terms = index.len(), dir = %paths.root.display(), "index build complete");
    Ok(())
}

fn shell(session: &Session, top: usize) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter a command (lookup, find, exit): ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { return Ok(()) };
        match line?.parse::<Command>() {
            Ok(Command::Lookup(term)) => session.lookup(&term),
            Ok(Command::Find(query)) => session.find(&query, top, false)?,
            Ok(Command::Help) => println!("lookup <term> | find <query> | exit"),
            Ok(Command::Exit) => return Ok(()),
            Err(e) => println!("{e}"),
        }
    }
}
