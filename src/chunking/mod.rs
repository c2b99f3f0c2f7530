
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Boundary the document is split on before packing
    pub separator: String,
    /// Maximum chunk size in characters
    pub max_size: usize,
    /// Overlap carried from the end of one chunk into the next, in characters.
    /// Overlap is taken at unit granularity: only whole separator-delimited
    /// units whose combined length fits this budget are re-included.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            separator: "\n\n".to_string(),
            max_size: 256,
            overlap: 20,
        }
    }
}

/// Split `text` into bounded, overlapping chunks.
///
/// The text is first split on `separator`, then consecutive units are packed
/// greedily until the next unit would push the chunk past `max_size`. The new
/// chunk re-includes trailing units of the previous chunk up to `overlap`
/// characters. A single unit longer than `max_size` is emitted as its own
/// oversized chunk rather than split mid-unit. Output preserves document
/// order. Empty or whitespace-only input yields no chunks.
#[inline]
pub fn chunk(text: &str, separator: &str, max_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let sep_len = separator.len();
    let units = text
        .split(separator)
        .filter(|unit| !unit.trim().is_empty())
        .collect::<Vec<_>>();

    let mut chunks = Vec::new();
    // Units making up the chunk being accumulated, plus its joined length
    let mut window: Vec<&str> = Vec::new();
    let mut window_len = 0;

    for unit in units {
        let joined = |len: usize, have: usize| {
            if have == 0 { len } else { len + sep_len }
        };

        if !window.is_empty() && window_len + joined(unit.len(), window.len()) > max_size {
            chunks.push(window.join(separator));

            // Keep only enough trailing units to satisfy the overlap budget,
            // and never so many that the incoming unit no longer fits
            while !window.is_empty()
                && (window_len > overlap
                    || window_len + joined(unit.len(), window.len()) > max_size)
            {
                let dropped = window.remove(0);
                window_len -= dropped.len();
                if !window.is_empty() {
                    window_len -= sep_len;
                }
            }
        }

        window_len += joined(unit.len(), window.len());
        window.push(unit);
    }

    if !window.is_empty() {
        chunks.push(window.join(separator));
    }

    debug!("Split {} chars into {} chunks", text.len(), chunks.len());
    chunks
}

/// Convenience wrapper applying a [`ChunkingConfig`]
#[inline]
pub fn chunk_with_config(text: &str, config: &ChunkingConfig) -> Vec<String> {
    chunk(text, &config.separator, config.max_size, config.overlap)
}
