//! # PDF RAG CLI (`rag`)
//!
//! Ingest PDFs into a Qdrant collection and ask questions about them.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag init` | Create the vector collection if it does not exist |
//! | `rag ingest <path>` | Ingest a local PDF |
//! | `rag fetch <url>` | Download a PDF (max 10 MiB) and ingest it |
//! | `rag ask "<question>"` | Answer a question with numbered sources |
//! | `rag status` | Show the collection and its point count |
//! | `rag serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! export QDRANT_URI=http://localhost:6333 QDRANT_API=... OPENROUTER=...
//! rag init
//! rag ingest ./papers/attention.pdf
//! rag ask "What is multi-head attention?" --max-tokens 768
//! ```
//!
//! A `.env` file in the working directory is loaded before the environment
//! is read. Logs go to stderr; set `RUST_LOG=pdf_rag=debug` for per-step detail.

use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use pdf_rag::config::{load_config, Config};
use pdf_rag::pipeline::Pipeline;
use pdf_rag::qdrant::QdrantIndex;
use pdf_rag::server::run_server;
use pdf_rag_core::store::VectorIndex;

/// Ask questions about PDF documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rag.example.toml` for a full example. Credentials are
/// read from `QDRANT_URI`, `QDRANT_API` and `OPENROUTER`.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "Retrieval-augmented Q&A over PDF documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when absent.
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector collection. Safe to run repeatedly.
    Init,

    /// Ingest a local PDF file.
    Ingest {
        /// Path to the PDF.
        path: PathBuf,
    },

    /// Download a PDF over HTTP(S) and ingest it.
    ///
    /// The source is cited under the last segment of the URL path.
    Fetch {
        url: String,
    },

    /// Answer a question from the ingested documents.
    Ask {
        question: String,

        /// Upper bound on generated tokens (512-1024 by default).
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Show the collection name and how many chunks it holds.
    Status,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdf_rag=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Ok(path) = &dotenv {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let pipeline = Arc::new(Pipeline::from_config(&cfg).await?);
            pipeline.ensure_collection().await?;
            run_server(&cfg.server.bind, pipeline).await?;
        }
        command => {
            interruptible(run_command(&cfg, command)).await?;
        }
    }

    Ok(())
}

async fn run_command(cfg: &Config, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init => {
            let index = QdrantIndex::new(&cfg.vector_store)?;
            index.ensure_collection().await?;
            println!(
                "collection {} ready ({} dims)",
                cfg.vector_store.collection, cfg.vector_store.dims
            );
            return Ok(());
        }
        Commands::Status => {
            let index = QdrantIndex::new(&cfg.vector_store)?;
            index.ensure_collection().await?;
            let count = index.count().await?;
            println!("collection: {}", cfg.vector_store.collection);
            println!("  url: {}", cfg.vector_store.url);
            println!("  points: {}", count);
            return Ok(());
        }
        Commands::Serve => anyhow::bail!("serve is not a one-shot command"),
        _ => {}
    }

    let pipeline = Pipeline::from_config(cfg).await?;
    pipeline.ensure_collection().await?;

    match command {
        Commands::Ingest { path } => {
            let report = pipeline.ingest_file(&path).await?;
            println!("ingested {}", report.source_file);
            println!("  chunks written: {}", report.chunks);
        }
        Commands::Fetch { url } => {
            let report = pipeline.ingest_url(&url).await?;
            println!("ingested {}", report.source_file);
            println!("  chunks written: {}", report.chunks);
        }
        Commands::Ask {
            question,
            max_tokens,
        } => {
            let answer = pipeline.answer(&question, max_tokens).await?;
            println!("{}", answer.answer.trim());
            if !answer.citations.is_empty() {
                println!();
                println!("Sources:");
                for (i, citation) in answer.citations.iter().enumerate() {
                    println!("{}. {}", i + 1, citation);
                }
            }
        }
        Commands::Init | Commands::Status | Commands::Serve => {}
    }

    Ok(())
}

/// Run `fut`, abandoning it on Ctrl-C. Work already sent upstream is not
/// undone.
async fn interruptible<F>(fut: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    tokio::select! {
        result = fut => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, in-flight request abandoned");
            std::process::exit(130);
        }
    }
}
