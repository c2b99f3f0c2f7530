// Embedding capability layer
// The provider produces raw vectors; unit-normalization is the pipeline's job


pub mod openai;

use crate::{RagError, Result};

pub use openai::OpenAiEmbeddings;

/// Capability interface for turning text into a fixed-dimension dense vector.
///
/// Implementations return the raw provider output; callers normalize via
/// [`normalize`]. Empty input is a caller precondition violation and must be
/// rejected before reaching a provider.
pub trait EmbeddingProvider: Send + Sync {
    /// Produce an embedding for `text`
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of the vectors this provider produces
    fn dimension(&self) -> usize;
}

/// Unit-normalize `vector` in place so cosine distance and dot-product
/// comparisons agree.
///
/// Fails with [`RagError::DegenerateEmbedding`] when the vector has zero norm
/// rather than dividing by zero.
#[inline]
pub fn normalize(vector: &mut [f32]) -> Result<()> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(RagError::DegenerateEmbedding);
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    Ok(())
}

/// Embed `text` and unit-normalize the result
#[inline]
pub fn embed_normalized(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    if text.trim().is_empty() {
        return Err(RagError::Validation(
            "cannot embed empty or whitespace-only text".to_string(),
        ));
    }
    let mut vector = provider.embed(text)?;
    normalize(&mut vector)?;
    Ok(vector)
}
