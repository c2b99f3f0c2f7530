
use std::sync::Arc;
use tracing::debug;

use crate::embeddings::{EmbeddingProvider, embed_normalized};
use crate::store::{ScoredChunk, VectorStore};
use crate::{RagError, Result};

/// Ranked passages grounding an answer, most similar first
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub chunks: Vec<ScoredChunk>,
    /// The k that was actually applied, so callers always see the bound
    pub effective_k: usize,
}

/// Embeds a question and runs a k-nearest-neighbor search against the store
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    #[inline]
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { provider, store }
    }

    /// Retrieve the `k` most similar stored chunks for `question`.
    ///
    /// A corpus holding fewer than `k` records returns fewer results; that is
    /// not an error. Empty or whitespace-only questions are rejected before
    /// any provider call.
    #[inline]
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        if question.trim().is_empty() {
            return Err(RagError::Validation(
                "question must not be empty".to_string(),
            ));
        }
        if k == 0 {
            return Err(RagError::Validation("k must be at least 1".to_string()));
        }

        let query_vector = embed_normalized(self.provider.as_ref(), question)?;
        let chunks = self.store.search(&query_vector, k).await?;

        debug!("Retrieved {} of up to {} passages", chunks.len(), k);
        Ok(RetrievalResult {
            chunks,
            effective_k: k,
        })
    }
}
