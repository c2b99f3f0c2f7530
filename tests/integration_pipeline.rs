#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end ingestion and query tests backed by a real on-disk vector
// store. Embedding and generation are replaced by deterministic local
// implementations so the tests run offline.

use std::sync::Arc;

use corpus_rag::chunking::ChunkingConfig;
use corpus_rag::context::ContextAssembler;
use corpus_rag::embeddings::EmbeddingProvider;
use corpus_rag::pipeline::{IngestionPipeline, QueryPipeline};
use corpus_rag::retriever::Retriever;
use corpus_rag::store::{LanceStore, VectorStore};
use corpus_rag::synthesis::AnswerSynthesizer;
use tempfile::TempDir;

const DIMENSION: usize = 3;

/// Maps known topics onto fixed directions so similarity is predictable.
/// Returns raw (unnormalized) vectors like a real provider would.
struct TopicProvider;

impl EmbeddingProvider for TopicProvider {
    fn embed(&self, text: &str) -> corpus_rag::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        if lower.contains("timescaledb") {
            Ok(vec![3.0, 0.1, 0.0])
        } else if lower.contains("kangaroo") {
            Ok(vec![0.1, 3.0, 0.0])
        } else {
            Ok(vec![0.0, 0.1, 3.0])
        }
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// Echoes the context back so tests can verify what grounded the answer
struct EchoSynthesizer;

impl AnswerSynthesizer for EchoSynthesizer {
    fn synthesize(&self, _question: &str, context: &str) -> corpus_rag::Result<String> {
        if context.is_empty() {
            Ok("The context does not contain that information.".to_string())
        } else {
            Ok(format!("Based on the context: {}", context))
        }
    }
}

async fn open_store(temp_dir: &TempDir) -> Arc<LanceStore> {
    let store = LanceStore::new(&temp_dir.path().join("vectors"), DIMENSION)
        .await
        .expect("should open store");
    Arc::new(store)
}

fn ingestion(store: Arc<LanceStore>) -> IngestionPipeline {
    IngestionPipeline::new(
        Arc::new(TopicProvider),
        store as Arc<dyn VectorStore>,
        ChunkingConfig::default(),
        4,
    )
}

fn query_pipeline(store: Arc<LanceStore>, default_top_k: usize) -> QueryPipeline {
    let retriever = Retriever::new(Arc::new(TopicProvider), store as Arc<dyn VectorStore>);
    QueryPipeline::new(
        retriever,
        ContextAssembler::new(),
        Arc::new(EchoSynthesizer),
        default_top_k,
    )
}

#[tokio::test]
async fn five_paragraph_document_round_trips_as_five_records() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir).await;

    // Paragraphs near the chunk ceiling: too big to pack together, too big
    // to be carried as overlap, so they map to one record each
    let paragraphs: Vec<String> = (0..5)
        .map(|i| format!("paragraph {} {}", i, "body ".repeat(40).trim_end()))
        .collect();
    let document = paragraphs.join("\n\n");

    let report = ingestion(Arc::clone(&store))
        .load_text(&document, &|_, _| {})
        .await
        .expect("should load");

    assert_eq!(report.chunks_loaded, 5);
    assert_eq!(store.count().await.expect("should count"), 5);

    let records = store.list_summary(10).await.expect("should list");
    assert_eq!(records.len(), 5);
    for (record, paragraph) in records.iter().zip(&paragraphs) {
        assert_eq!(&record.contents, paragraph);
        assert!(record.embedding_preview.starts_with('['));
    }
}

#[tokio::test]
async fn query_retrieves_the_relevant_passage() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir).await;

    let pipeline = ingestion(Arc::clone(&store));
    pipeline
        .load_text(
            "TimescaleDB is an open-source time-series database.",
            &|_, _| {},
        )
        .await
        .expect("should load first document");
    pipeline
        .load_text(
            "Kangaroos are large marsupials native to Australia.",
            &|_, _| {},
        )
        .await
        .expect("should load second document");

    let outcome = query_pipeline(store, 20)
        .query("What is TimescaleDB?", Some(1))
        .await
        .expect("should answer");

    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.effective_k, 1);
    assert_eq!(
        outcome.sources[0].contents,
        "TimescaleDB is an open-source time-series database."
    );
    assert!(outcome.answer.contains("time-series database"));
    assert!(!outcome.answer.contains("Kangaroo"));
}

#[tokio::test]
async fn nearest_passage_has_smallest_distance() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir).await;

    let pipeline = ingestion(Arc::clone(&store));
    for document in [
        "TimescaleDB is an open-source time-series database.",
        "Kangaroos are large marsupials native to Australia.",
        "Bread rises because yeast produces carbon dioxide.",
    ] {
        pipeline
            .load_text(document, &|_, _| {})
            .await
            .expect("should load");
    }

    let outcome = query_pipeline(store, 20)
        .query("What is TimescaleDB?", Some(3))
        .await
        .expect("should answer");

    assert_eq!(outcome.sources.len(), 3);
    assert!(outcome.sources[0].contents.contains("TimescaleDB"));
    for pair in outcome.sources.windows(2) {
        assert!(
            pair[0].distance <= pair[1].distance,
            "results must be ordered by ascending distance"
        );
    }
}

#[tokio::test]
async fn empty_store_query_answers_without_sources() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_store(&temp_dir).await;

    let outcome = query_pipeline(store, 20)
        .query("What is TimescaleDB?", None)
        .await
        .expect("cold store is not an error");

    assert!(outcome.sources.is_empty());
    assert_eq!(
        outcome.answer,
        "The context does not contain that information."
    );
}
