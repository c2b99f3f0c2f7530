// Pipeline orchestration
// Ingestion: Reading -> Chunking -> Embedding -> Inserting -> Indexing
// Query: Retrieval -> Synthesis


use futures::StreamExt;
use futures::stream;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::chunking::{ChunkingConfig, chunk_with_config};
use crate::context::ContextAssembler;
use crate::embeddings::{EmbeddingProvider, embed_normalized};
use crate::retriever::Retriever;
use crate::store::{DistanceMetric, NewRecord, ScoredChunk, VectorStore};
use crate::synthesis::AnswerSynthesizer;
use crate::RagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Reading,
    Chunking,
    Embedding,
    Inserting,
    Indexing,
}

impl std::fmt::Display for IngestStage {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestStage::Reading => "reading",
            IngestStage::Chunking => "chunking",
            IngestStage::Embedding => "embedding",
            IngestStage::Inserting => "inserting",
            IngestStage::Indexing => "indexing",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Retrieval,
    Synthesis,
}

impl std::fmt::Display for QueryStage {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QueryStage::Retrieval => "retrieval",
            QueryStage::Synthesis => "synthesis",
        };
        write!(f, "{}", name)
    }
}

/// Ingestion failure, carrying the stage and the partial progress so a caller
/// can decide whether to retry the whole load. No stage retries automatically.
#[derive(Debug, Error)]
#[error("Ingestion failed during {stage} ({embedded} of {total} chunks embedded): {source}")]
pub struct IngestError {
    pub stage: IngestStage,
    pub embedded: usize,
    pub total: usize,
    #[source]
    pub source: RagError,
}

/// Query failure identifying the sub-stage, so callers can tell "no relevant
/// data" from "generation is down"
#[derive(Debug, Error)]
#[error("Query failed during {stage}: {source}")]
pub struct QueryError {
    pub stage: QueryStage,
    #[source]
    pub source: RagError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks_loaded: usize,
}

/// Generated answer together with the passages that grounded it
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
    pub effective_k: usize,
}

/// Loads a document: chunk, embed, insert, index
pub struct IngestionPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunking: ChunkingConfig,
    embed_concurrency: usize,
}

impl IngestionPipeline {
    #[inline]
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        chunking: ChunkingConfig,
        embed_concurrency: usize,
    ) -> Self {
        Self {
            provider,
            store,
            chunking,
            embed_concurrency: embed_concurrency.max(1),
        }
    }

    /// Load a document from a file path
    #[inline]
    pub async fn load_file(
        &self,
        path: &Path,
        progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<IngestReport, IngestError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| IngestError {
            stage: IngestStage::Reading,
            embedded: 0,
            total: 0,
            source: RagError::Io(e),
        })?;

        self.load_text(&text, progress).await
    }

    /// Load a document from text already in memory. `progress` is invoked
    /// with (embedded, total) after each chunk's embedding completes.
    #[inline]
    pub async fn load_text(
        &self,
        text: &str,
        progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<IngestReport, IngestError> {
        let chunks = chunk_with_config(text, &self.chunking);
        let total = chunks.len();
        if chunks.is_empty() {
            debug!("Document produced no chunks, nothing to load");
            return Ok(IngestReport { chunks_loaded: 0 });
        }
        info!("Chunked document into {} chunks", total);

        // Embedding calls run concurrently up to the configured bound;
        // `buffered` yields results back in document order, which is what the
        // store's insertion-order tie-break depends on
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(total);
        let mut results = stream::iter(chunks.clone())
            .map(|chunk| {
                let provider = Arc::clone(&self.provider);
                tokio::task::spawn_blocking(move || embed_normalized(provider.as_ref(), &chunk))
            })
            .buffered(self.embed_concurrency);

        while let Some(joined) = results.next().await {
            let embedding = joined
                .map_err(|e| RagError::Provider(format!("Embedding task failed: {}", e)))
                .and_then(|inner| inner)
                .map_err(|source| IngestError {
                    stage: IngestStage::Embedding,
                    embedded: embeddings.len(),
                    total,
                    source,
                })?;
            embeddings.push(embedding);
            progress(embeddings.len(), total);
        }

        let records: Vec<NewRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(contents, embedding)| NewRecord {
                contents,
                embedding,
            })
            .collect();

        self.store.insert(records).await.map_err(|source| IngestError {
            stage: IngestStage::Inserting,
            embedded: total,
            total,
            source,
        })?;

        // One index build per load, after all inserts, never per record
        self.store
            .ensure_index(DistanceMetric::Cosine)
            .await
            .map_err(|source| IngestError {
                stage: IngestStage::Indexing,
                embedded: total,
                total,
                source,
            })?;

        info!("Loaded {} chunks", total);
        Ok(IngestReport {
            chunks_loaded: total,
        })
    }
}

/// Answers a question: retrieve, assemble, synthesize
pub struct QueryPipeline {
    retriever: Retriever,
    assembler: ContextAssembler,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    default_top_k: usize,
}

impl QueryPipeline {
    #[inline]
    pub fn new(
        retriever: Retriever,
        assembler: ContextAssembler,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        default_top_k: usize,
    ) -> Self {
        Self {
            retriever,
            assembler,
            synthesizer,
            default_top_k,
        }
    }

    /// Answer `question`, returning the answer together with the raw
    /// retrieval result for provenance. Any stage failure aborts the
    /// pipeline; there is no partial-answer fallback.
    #[inline]
    pub async fn query(
        &self,
        question: &str,
        k: Option<usize>,
    ) -> Result<QueryOutcome, QueryError> {
        let k = k.unwrap_or(self.default_top_k);

        let retrieval = self
            .retriever
            .retrieve(question, k)
            .await
            .map_err(|source| QueryError {
                stage: QueryStage::Retrieval,
                source,
            })?;
        debug!("Retrieved {} passages for synthesis", retrieval.chunks.len());

        // An empty retrieval (cold store) is not an error; synthesis still
        // runs over the empty context and the model is instructed not to
        // fabricate
        let context = self.assembler.assemble(&retrieval.chunks);

        let synthesizer = Arc::clone(&self.synthesizer);
        let question_owned = question.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            synthesizer.synthesize(&question_owned, &context)
        })
        .await
        .map_err(|e| QueryError {
            stage: QueryStage::Synthesis,
            source: RagError::Synthesis(format!("Synthesis task failed: {}", e)),
        })?
        .map_err(|source| QueryError {
            stage: QueryStage::Synthesis,
            source,
        })?;

        Ok(QueryOutcome {
            answer,
            sources: retrieval.chunks,
            effective_k: retrieval.effective_k,
        })
    }
}
