// Vector store capability layer
// The persisted index engine is pluggable; the pipelines only see this trait


pub mod lance;

use async_trait::async_trait;

use crate::Result;

pub use lance::LanceStore;

/// How many leading vector dimensions a summary preview shows
pub const VECTOR_PREVIEW_DIMENSIONS: usize = 5;

/// Distance metric for the similarity index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`; smaller is more similar. Requires
    /// unit-normalized vectors for consistent comparison.
    Cosine,
}

impl std::fmt::Display for DistanceMetric {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
        }
    }
}

/// A chunk and its vector, ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub contents: String,
    pub embedding: Vec<f32>,
}

/// One search hit: chunk text plus its distance to the query vector
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub contents: String,
    pub distance: f32,
}

/// Bounded introspection view of a stored record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSummary {
    pub id: String,
    pub contents: String,
    /// First few dimensions plus an ellipsis marker; observability only
    pub embedding_preview: String,
}

/// Capability interface over a persisted collection of (text, vector) records
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append records atomically; a partial failure must not leave text
    /// without its vector or vice versa
    async fn insert(&self, records: Vec<NewRecord>) -> Result<()>;

    /// Build or confirm the similarity index for `metric`. Idempotent, and
    /// serialized against concurrent calls for the same index.
    async fn ensure_index(&self, metric: DistanceMetric) -> Result<()>;

    /// Return the `k` nearest records, ascending by distance, ties broken by
    /// insertion order
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Bounded record preview for observability; never load-bearing
    async fn list_summary(&self, limit: usize) -> Result<Vec<RecordSummary>>;

    /// Names of existing similarity indexes
    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Drop a named similarity index (store maintenance, not record deletion)
    async fn delete_index(&self, name: &str) -> Result<()>;

    /// Number of stored records
    async fn count(&self) -> Result<u64>;
}

/// Render the truncated vector preview used by [`RecordSummary`]
#[inline]
pub fn format_vector_preview(vector: &[f32]) -> String {
    let shown: Vec<String> = vector
        .iter()
        .take(VECTOR_PREVIEW_DIMENSIONS)
        .map(|v| format!("{:.4}", v))
        .collect();
    if vector.len() > VECTOR_PREVIEW_DIMENSIONS {
        format!("[{}, ...]", shown.join(", "))
    } else {
        format!("[{}]", shown.join(", "))
    }
}
