//! # Groundwork CLI (`gw`)
//!
//! The `gw` binary drives the question-answering engine from the command
//! line and hosts the HTTP API.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gw serve` | Start the HTTP API server (seeding the knowledge base first) |
//! | `gw ingest <paths>` | Ingest text files, warming the durable embedding cache |
//! | `gw search "<query>"` | Rank seeded content against a query |
//! | `gw ask "<question>"` | Answer a question from seeded content |
//! | `gw status` | Probe provider connectivity |
//!
//! The knowledge store lives in process memory; `search` and `ask` load the
//! seed directory before querying. Because embeddings are cached on disk by
//! content fingerprint, repeat runs over unchanged content make no
//! embedding-provider calls.
//!
//! ## Examples
//!
//! ```bash
//! # Serve the API with a seed directory
//! gw serve --seed ./content
//!
//! # Warm the embedding cache for a directory of notes
//! gw ingest ./content/*.md
//!
//! # One-shot question answering
//! gw ask "What is the next expedition?" --seed ./content
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use groundwork::cache::EmbeddingCache;
use groundwork::config::{self, Config};
use groundwork::embedding::{create_embedder, EmbeddingProvider};
use groundwork::engine::{AskRequest, RagEngine};
use groundwork::generation::{create_generator, GenerationProvider};
use groundwork::models::{AnswerMethod, DocumentInput};
use groundwork::server::{self, AppState};
use groundwork::status::StatusMonitor;

/// Groundwork — a retrieval-augmented question answering engine with
/// cached embeddings and grounded, source-attributed answers.
#[derive(Parser)]
#[command(
    name = "gw",
    about = "Groundwork — retrieval-augmented question answering with cached embeddings",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults are used if the file
    /// does not exist.
    #[arg(long, global = true, default_value = "./config/groundwork.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    ///
    /// Seeds the knowledge base from the seed directory (if configured),
    /// then serves `/api/ingest`, `/api/search`, `/api/ask`, and
    /// `/api/status` until terminated.
    Serve {
        /// Directory of .md/.txt files to ingest at startup.
        /// Overrides `engine.seed_dir` from the config.
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Ingest text files into the engine, warming the embedding cache.
    ///
    /// The durable cache means later `serve` or `ask` runs over the same
    /// content perform zero embedding calls.
    Ingest {
        /// UTF-8 text files to ingest.
        paths: Vec<PathBuf>,

        /// Source label recorded on each document.
        #[arg(long, default_value = "file")]
        source: String,

        /// Category recorded on each document.
        #[arg(long, default_value = "General")]
        category: String,
    },

    /// Rank seeded content against a query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results (capped by config).
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum cosine similarity for a result.
        #[arg(long)]
        threshold: Option<f32>,

        /// Directory of .md/.txt files to ingest before querying.
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Answer a question from seeded content.
    Ask {
        /// The question to answer.
        question: String,

        /// Skip retrieval and ask the generation provider directly.
        #[arg(long)]
        direct: bool,

        /// Extra free-form context for the prompt.
        #[arg(long)]
        context: Option<String>,

        /// Directory of .md/.txt files to ingest before asking.
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Probe embedding and generation provider connectivity.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("groundwork=info,gw=info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Serve { seed } => {
            // The monitor probes the same provider adapters the engine
            // calls, so status reflects what requests will actually see.
            let embedder: Arc<dyn EmbeddingProvider> = create_embedder(&cfg.embedding)?.into();
            let generator: Arc<dyn GenerationProvider> = create_generator(&cfg.generation)?.into();

            let engine = Arc::new(RagEngine::new(
                cfg.engine.clone(),
                EmbeddingCache::open(&cfg.cache.path),
                embedder.clone(),
                generator.clone(),
            ));
            if let Some(dir) = seed.or_else(|| cfg.engine.seed_dir.clone()) {
                seed_from_dir(&engine, &dir).await?;
            }

            let monitor = Arc::new(StatusMonitor::new(
                embedder,
                generator,
                Duration::from_secs(cfg.status.ttl_secs),
            ));

            server::run_server(&cfg.server.bind, AppState { engine, monitor }).await?;
        }

        Commands::Ingest {
            paths,
            source,
            category,
        } => {
            if paths.is_empty() {
                anyhow::bail!("no input files given");
            }
            let engine = build_engine(&cfg)?;

            println!("ingest");
            let mut documents = 0usize;
            let mut chunks = 0usize;
            for path in &paths {
                let receipt = engine
                    .ingest(document_from_file(path, &source, &category)?)
                    .await?;
                documents += 1;
                chunks += receipt.chunks;
                println!(
                    "  {} -> {} ({} chunks)",
                    path.display(),
                    receipt.document_id,
                    receipt.chunks
                );
            }

            println!("  documents: {}", documents);
            println!("  chunks: {}", chunks);
            println!("  cached embeddings: {}", engine.cached_embeddings());
            println!("ok");
        }

        Commands::Search {
            query,
            limit,
            threshold,
            seed,
        } => {
            let engine = build_engine(&cfg)?;
            if let Some(dir) = seed.or_else(|| cfg.engine.seed_dir.clone()) {
                seed_from_dir(&engine, &dir).await?;
            }

            let results = engine.search(&query, limit, threshold).await?;
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }

            for (i, hit) in results.iter().enumerate() {
                println!(
                    "{}. [{:.2}] {} / {}",
                    i + 1,
                    hit.similarity,
                    hit.source,
                    hit.title
                );
                println!("    relevance: {:.2}", hit.relevance);
                println!("    url: {}", hit.url);
                println!(
                    "    excerpt: \"{}\"",
                    hit.snippet.replace('\n', " ").trim()
                );
                println!();
            }
        }

        Commands::Ask {
            question,
            direct,
            context,
            seed,
        } => {
            let engine = build_engine(&cfg)?;
            if !direct {
                if let Some(dir) = seed.or_else(|| cfg.engine.seed_dir.clone()) {
                    seed_from_dir(&engine, &dir).await?;
                }
            }

            let answer = engine
                .ask(AskRequest {
                    question,
                    use_retrieval: !direct,
                    context,
                })
                .await?;

            println!("{}", answer.answer);
            println!();
            if !answer.sources.is_empty() {
                println!("sources:");
                for s in &answer.sources {
                    println!("  [{:.2}] {} ({})", s.similarity, s.title, s.category);
                }
            }
            let method = match answer.method {
                AnswerMethod::Retrieval => "retrieval",
                AnswerMethod::Direct => "direct",
            };
            println!("confidence: {:.2} ({})", answer.confidence, method);
        }

        Commands::Status => {
            let monitor = StatusMonitor::new(
                create_embedder(&cfg.embedding)?.into(),
                create_generator(&cfg.generation)?.into(),
                Duration::from_secs(cfg.status.ttl_secs),
            );
            let report = monitor.status().await;

            println!("groundwork status");
            println!(
                "  embedding:  {} ({}) — {}",
                report.embedding.provider,
                report.embedding.model,
                if report.embedding.connected { "connected" } else { "unreachable" }
            );
            println!(
                "  generation: {} ({}) — {}",
                report.generation.provider,
                report.generation.model,
                if report.generation.connected { "connected" } else { "unreachable" }
            );
        }
    }

    Ok(())
}

fn build_engine(cfg: &Config) -> Result<RagEngine> {
    Ok(RagEngine::new(
        cfg.engine.clone(),
        EmbeddingCache::open(&cfg.cache.path),
        create_embedder(&cfg.embedding)?.into(),
        create_generator(&cfg.generation)?.into(),
    ))
}

/// Build an ingestion payload from a UTF-8 text file. The file stem becomes
/// the title (and thus the document identifier), so re-running over an
/// unchanged file supersedes rather than duplicates.
fn document_from_file(path: &Path, source: &str, category: &str) -> Result<DocumentInput> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("could not read {}: {}", path.display(), e))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled");
    let title = stem.replace(['-', '_'], " ");

    Ok(DocumentInput {
        title,
        source: format!("{}:{}", source, stem),
        url: format!("/{}", stem),
        access: Default::default(),
        text,
        category: Some(category.to_string()),
        tags: Vec::new(),
        metadata: Default::default(),
    })
}

/// Ingest every .md/.txt file in a directory. Per-file failures are logged
/// and skipped so one bad file does not block the rest of the seed set.
async fn seed_from_dir(engine: &RagEngine, dir: &Path) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("could not read seed dir {}: {}", dir.display(), e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("md") | Some("txt")
            )
        })
        .collect();
    entries.sort();

    let mut seeded = 0usize;
    for path in &entries {
        let input = match document_from_file(path, "seed", "General") {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable seed file");
                continue;
            }
        };
        match engine.ingest(input).await {
            Ok(_) => seeded += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping seed file");
            }
        }
    }

    tracing::info!(dir = %dir.display(), seeded, "seeded knowledge base");
    Ok(())
}
