use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use ragstore_core::config::Settings;
use ragstore_core::data_processor::{DataProcessor, TextSplitter};
use ragstore_core::types::SourceText;
use ragstore_hybrid::ServiceContext;
use ragstore_text::CorpusStats;

/// Hybrid dense + sparse document store
#[derive(Parser)]
#[command(name = "ragstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Override `store.uri`
    #[arg(long, global = true)]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split, embed and store the .txt/.md files under a directory
    Ingest {
        dir: PathBuf,
        #[arg(short, long)]
        collection: String,
        /// Only ingest the first N files
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Hybrid search over a collection
    Query {
        question: String,
        #[arg(short, long)]
        collection: String,
        #[arg(short)]
        k: Option<usize>,
    },
    /// List collections
    Collections,
    /// Drop a collection and all of its records
    Drop { name: String },
    /// Drop every collection in the store
    Reset,
    /// Row count, load state and schema of a collection
    Stats { name: String },
    /// Fit BM25 corpus statistics over a directory and write them as JSON
    FitSparse {
        dir: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
}

#[derive(Serialize)]
struct StatsOutput {
    #[serde(flatten)]
    stats: ragstore_vector::CollectionStats,
    schema: ragstore_vector::CollectionSchema,
}

#[derive(Serialize)]
struct FitOutput {
    out: String,
    documents: u64,
    terms: usize,
    avg_doc_len: f32,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_docs(dir: &Path, limit: Option<usize>) -> Result<Vec<SourceText>> {
    let processor = DataProcessor::new();
    let docs = match limit {
        Some(n) => processor.process_directory_limited(dir, n)?,
        None => processor.process_directory(dir)?,
    };
    tracing::info!(dir = %dir.display(), documents = docs.len(), "loaded documents");
    Ok(docs)
}

fn fit_sparse(dir: &Path, out: &Path, chunk_size: Option<usize>, overlap: Option<usize>, settings: &Settings) -> Result<()> {
    let docs = load_docs(dir, None)?;
    let splitter = TextSplitter::new(chunk_size.unwrap_or(settings.ingest.chunk_size), overlap.unwrap_or(settings.ingest.overlap))?;
    let chunks = splitter.split_documents(&docs);
    let stats = CorpusStats::fit(chunks.iter().map(|c| c.text.as_str()));
    stats.save(out)?;
    tracing::info!(out = %out.display(), chunks = chunks.len(), terms = stats.doc_freq.len(), "fitted BM25 statistics");
    print_json(&FitOutput { out: out.display().to_string(), documents: stats.doc_count, terms: stats.doc_freq.len(), avg_doc_len: stats.avg_doc_len })
}

pub async fn run(command: Commands, settings: Settings) -> Result<()> {
    match command {
        // needs neither the store nor the models
        Commands::FitSparse { dir, out, chunk_size, overlap } => fit_sparse(&dir, &out, chunk_size, overlap, &settings),
        command => {
            let ctx = ServiceContext::from_settings(settings).await?;
            run_with_context(command, &ctx).await
        }
    }
}

async fn run_with_context(command: Commands, ctx: &ServiceContext) -> Result<()> {
    let defaults = &ctx.settings;
    match command {
        Commands::Ingest { dir, collection, limit, batch_size, chunk_size, overlap } => {
            let docs = load_docs(&dir, limit)?;
            let resp = ctx
                .ingest(
                    &collection,
                    &docs,
                    chunk_size.unwrap_or(defaults.ingest.chunk_size),
                    overlap.unwrap_or(defaults.ingest.overlap),
                    batch_size.unwrap_or(defaults.ingest.batch_size),
                )
                .await?;
            print_json(&resp)
        }
        Commands::Query { question, collection, k } => {
            let passages = ctx.query(&collection, &question, k.unwrap_or(defaults.search.top_k)).await?;
            print_json(&passages)
        }
        Commands::Collections => print_json(&ctx.list_collections().await?),
        Commands::Drop { name } => {
            ctx.delete_collection(&name).await?;
            print_json(&serde_json::json!({ "dropped": name }))
        }
        Commands::Reset => print_json(&serde_json::json!({ "dropped": ctx.reset().await? })),
        Commands::Stats { name } => {
            let stats = ctx.store.collection_stats(&name).await?;
            let schema = ctx.store.schema(&name).await?;
            print_json(&StatsOutput { stats, schema })
        }
        Commands::FitSparse { dir, out, chunk_size, overlap } => fit_sparse(&dir, &out, chunk_size, overlap, defaults),
    }
}
