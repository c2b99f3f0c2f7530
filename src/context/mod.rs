
use tracing::debug;

use crate::store::ScoredChunk;

/// Separator between passages in the assembled context block. Tests that
/// reconstruct context depend on this being a single space.
pub const CONTEXT_SEPARATOR: &str = " ";

/// Concatenates retrieved passages into the context block for the prompt
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    /// Optional character budget. When set, passages are dropped from the
    /// tail (least similar first) until the block fits; passages are never
    /// cut mid-chunk. Off by default: the contract keeps every retrieved
    /// chunk.
    pub char_budget: Option<usize>,
}

impl ContextAssembler {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_char_budget(budget: usize) -> Self {
        Self {
            char_budget: Some(budget),
        }
    }

    /// Join the passage texts in the ranked order given. No re-ranking, no
    /// deduplication.
    #[inline]
    pub fn assemble(&self, chunks: &[ScoredChunk]) -> String {
        let mut included = chunks.len();
        if let Some(budget) = self.char_budget {
            let mut total = 0;
            included = 0;
            for chunk in chunks {
                let added = chunk.contents.len()
                    + if included > 0 {
                        CONTEXT_SEPARATOR.len()
                    } else {
                        0
                    };
                if total + added > budget {
                    break;
                }
                total += added;
                included += 1;
            }
            if included < chunks.len() {
                debug!(
                    "Context budget {} dropped {} of {} passages",
                    budget,
                    chunks.len() - included,
                    chunks.len()
                );
            }
        }

        chunks
            .iter()
            .take(included)
            .map(|chunk| chunk.contents.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }
}
