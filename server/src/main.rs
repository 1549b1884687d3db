use anyhow::Result;
use clap::Parser;
use minisearch_core::persist::{load_meta, IndexPaths, MetaFile};
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server", about = "Serve queries over an index built by `indexer build`")]
struct Args {
    /// Index directory written by the indexer
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn print_summary(dir: &std::path::Path, meta: &MetaFile) {
    println!("index      {}", dir.display());
    println!("seed       {}", meta.seed);
    println!("pages      {} visited / {} known", meta.num_visited, meta.num_pages);
    println!("terms      {}", meta.num_terms);
    println!("built at   {}", meta.created_at);
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    match load_meta(&IndexPaths::new(&args.index)) {
        Ok(meta) => print_summary(&args.index, &meta),
        Err(e) => tracing::warn!(index = %args.index.display(), "no index summary: {e:#}"),
    }

    let config = ServerConfig::from_env(args.index.clone());
    if config.admin_token.is_none() {
        tracing::info!("ADMIN_TOKEN unset; /admin/reload is disabled");
    }
    let app = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    println!("listening  http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
