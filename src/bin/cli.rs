//! Index CLI - command-line driver for the index lifecycle library.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;

use codesearch_index::embeddings::HttpEmbeddingProvider;
use codesearch_index::embeddings::HttpProviderConfig;
use codesearch_index::Index;

#[derive(Parser)]
#[command(name = "codesearch-index-cli")]
#[command(about = "Build and query a local semantic code index")]
struct Cli {
    /// Project directory to index/search
    #[arg(default_value = ".")]
    project_dir: PathBuf,

    /// Embedding endpoint (OpenAI-compatible /embeddings route)
    #[arg(long, env = "CODESEARCH_EMBED_ENDPOINT", default_value = "http://localhost:11434/v1/embeddings")]
    embed_endpoint: String,

    /// Embedding model name
    #[arg(long, env = "CODESEARCH_EMBED_MODEL", default_value = "nomic-embed-text")]
    embed_model: String,

    /// Embedding vector dimension
    #[arg(long, env = "CODESEARCH_EMBED_DIM", default_value = "768")]
    embed_dim: usize,

    /// API key for the embedding endpoint, if required
    #[arg(long, env = "CODESEARCH_EMBED_API_KEY")]
    embed_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show index status for this project
    Status,

    /// Build a fresh index from scratch
    Create,

    /// Reindex only what changed since the last run
    Reindex,

    /// Reindex a single project-relative file
    ReindexFile {
        /// Path relative to the project root
        path: String,
    },

    /// Semantic search over indexed chunks
    Search {
        /// Search query
        query: String,
        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// List indexed files matching a glob
    Files {
        /// Glob pattern, e.g. "src/**/*.rs"
        glob: String,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Watch the project and print debounced change batches
    Watch,

    /// Delete the index for this project
    Delete,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codesearch_index=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_dir = cli.project_dir.canonicalize().unwrap_or(cli.project_dir.clone());

    let provider = HttpEmbeddingProvider::new(HttpProviderConfig {
        endpoint: cli.embed_endpoint,
        model: cli.embed_model,
        api_key: cli.embed_api_key,
        dimension: cli.embed_dim,
    });

    let index = Index::open(&project_dir, provider)?;

    match cli.command {
        Command::Status => cmd_status(&index).await?,
        Command::Create => cmd_create(&index).await?,
        Command::Reindex => cmd_reindex(&index).await?,
        Command::ReindexFile { path } => cmd_reindex_file(&index, &path).await?,
        Command::Search { query, limit } => cmd_search(&index, &query, limit).await?,
        Command::Files { glob, limit } => cmd_files(&index, &glob, limit).await?,
        Command::Watch => cmd_watch(&project_dir).await?,
        Command::Delete => cmd_delete(&index).await?,
    }

    Ok(())
}

async fn cmd_status(index: &Index) -> anyhow::Result<()> {
    let status = index.status().await?;
    if !status.exists {
        println!("No index yet. Run `create` first.");
        return Ok(());
    }
    let metadata = status.metadata.expect("exists implies metadata");
    println!("state:              {:?}", metadata.indexing_state.state);
    println!("total files:        {}", metadata.stats.total_files);
    println!("total chunks:       {}", metadata.stats.total_chunks);
    println!("storage size bytes: {}", metadata.stats.storage_size_bytes);
    if let Some(last_full) = metadata.last_full_index {
        println!("last full index:    {last_full}");
    }
    if let Some(last_incremental) = metadata.last_incremental_update {
        println!("last incremental:   {last_incremental}");
    }
    Ok(())
}

async fn cmd_create(index: &Index) -> anyhow::Result<()> {
    let on_progress = Arc::new(|progress: codesearch_index::types::Progress| {
        eprintln!("{:?}: {}/{}", progress.phase, progress.processed, progress.total);
    });
    let stats = index.create_index(Some(on_progress)).await?;
    println!("indexed {} files, {} chunks", stats.total_files, stats.total_chunks);
    Ok(())
}

async fn cmd_reindex(index: &Index) -> anyhow::Result<()> {
    let stats = index.reindex_project(None).await?;
    println!("reindexed {} files, {} chunks", stats.total_files, stats.total_chunks);
    Ok(())
}

async fn cmd_reindex_file(index: &Index, path: &str) -> anyhow::Result<()> {
    index.reindex_file(path).await?;
    println!("reindexed {path}");
    Ok(())
}

async fn cmd_search(index: &Index, query: &str, limit: usize) -> anyhow::Result<()> {
    let hits = index.search_code(query, limit).await?;
    for hit in hits {
        println!("{}:{}-{}  (score {:.4})", hit.path, hit.start_line, hit.end_line, hit.score);
        for line in hit.text.lines().take(3) {
            println!("    {line}");
        }
    }
    Ok(())
}

async fn cmd_files(index: &Index, glob: &str, limit: usize) -> anyhow::Result<()> {
    let files = index.search_by_path(glob, limit).await?;
    for file in files {
        println!("{file}");
    }
    Ok(())
}

async fn cmd_watch(project_dir: &std::path::Path) -> anyhow::Result<()> {
    let config = codesearch_index::config::Config::load(&codesearch_index::paths::config_path(
        &codesearch_index::paths::project_dir(project_dir)?,
    ));
    let policy = codesearch_index::policy::PolicyFilter::new(project_dir, &config)?;
    let mut watcher = codesearch_index::watcher::FileWatcher::start(project_dir, policy)?;
    println!("watching {} (ctrl-c to stop)", project_dir.display());
    while let Some(batch) = watcher.recv().await {
        for path in &batch.changed {
            println!("changed: {path}");
        }
        for path in &batch.removed {
            println!("removed: {path}");
        }
    }
    Ok(())
}

async fn cmd_delete(index: &Index) -> anyhow::Result<()> {
    index.delete_index().await?;
    println!("deleted index");
    Ok(())
}
