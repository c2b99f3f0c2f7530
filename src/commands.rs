use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::context::ContextAssembler;
use crate::embeddings::OpenAiEmbeddings;
use crate::pipeline::{IngestionPipeline, QueryPipeline};
use crate::retriever::Retriever;
use crate::store::{LanceStore, VectorStore};
use crate::synthesis::AnthropicSynthesizer;

async fn open_store(config: &Config) -> Result<Arc<LanceStore>> {
    let store = LanceStore::new(&config.vector_db_path(), config.embedding.dimension)
        .await
        .context("Failed to open vector store")?;
    Ok(Arc::new(store))
}

/// Chunk, embed, and store a document file
#[inline]
pub async fn load(file_path: &Path) -> Result<()> {
    let config = Config::from_env()?;
    info!("Loading document: {}", file_path.display());

    let store = open_store(&config).await?;
    let provider = Arc::new(OpenAiEmbeddings::new(&config.embedding)?);
    let pipeline = IngestionPipeline::new(
        provider,
        Arc::clone(&store) as Arc<dyn VectorStore>,
        config.chunking.clone(),
        config.retrieval.embed_concurrency,
    );

    let bar = ProgressBar::new(0).with_style(
        ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
            .expect("style template is valid"),
    );
    let report = pipeline
        .load_file(file_path, &|done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        })
        .await?;
    bar.finish_and_clear();

    println!("Loaded {} chunks from {}", report.chunks_loaded, file_path.display());
    println!("Total records in store: {}", store.count().await?);

    Ok(())
}

/// Answer a question from the stored corpus
#[inline]
pub async fn query(question: &str, top_k: Option<usize>) -> Result<()> {
    let config = Config::from_env()?;

    let store = open_store(&config).await?;
    let provider = Arc::new(OpenAiEmbeddings::new(&config.embedding)?);
    let synthesizer = Arc::new(AnthropicSynthesizer::new(&config.generation)?);

    let retriever = Retriever::new(provider, store as Arc<dyn VectorStore>);
    let pipeline = QueryPipeline::new(
        retriever,
        ContextAssembler::new(),
        synthesizer,
        config.retrieval.top_k,
    );

    let outcome = pipeline.query(question, top_k).await?;

    println!("{}", outcome.answer);
    println!();
    println!(
        "Sources ({} of up to {} requested):",
        outcome.sources.len(),
        outcome.effective_k
    );
    for (rank, chunk) in outcome.sources.iter().enumerate() {
        println!("  {}. (distance {:.4}) {}", rank + 1, chunk.distance, chunk.contents);
    }

    Ok(())
}

/// Show the first few stored records with truncated embeddings
#[inline]
pub async fn head(limit: usize) -> Result<()> {
    let config = Config::from_env()?;
    let store = open_store(&config).await?;

    let records = store.list_summary(limit).await?;
    if records.is_empty() {
        println!("The store is empty. Use 'corpus-rag load <file>' to add documents.");
        return Ok(());
    }

    println!("Showing {} of {} records:", records.len(), store.count().await?);
    for record in &records {
        println!("{}", record.id);
        println!("  contents: {}", record.contents);
        println!("  embedding: {}", record.embedding_preview);
    }

    Ok(())
}

/// List the similarity indexes that exist on the store
#[inline]
pub async fn list_indexes() -> Result<()> {
    let config = Config::from_env()?;
    let store = open_store(&config).await?;

    let indexes = store.list_indexes().await?;
    if indexes.is_empty() {
        println!("No similarity indexes exist yet.");
        println!("An index is built automatically once enough records are loaded.");
        return Ok(());
    }

    println!("Similarity indexes ({} total):", indexes.len());
    for name in &indexes {
        println!("  {}", name);
    }

    Ok(())
}

/// Drop a named similarity index. Records are untouched; searches fall back
/// to a flat scan until the index is rebuilt.
#[inline]
pub async fn delete_index(name: &str) -> Result<()> {
    let config = Config::from_env()?;
    let store = open_store(&config).await?;

    store
        .delete_index(name)
        .await
        .with_context(|| format!("Failed to delete index {}", name))?;

    println!("Deleted index: {}", name);
    println!("Searches will use a flat scan until an index is rebuilt.");

    Ok(())
}
