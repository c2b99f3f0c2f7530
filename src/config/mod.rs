
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;
use crate::{RagError, Result};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
pub const DEFAULT_GENERATION_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_TOP_K: usize = 20;
pub const DEFAULT_EMBED_CONCURRENCY: usize = 8;

/// Application configuration, sourced entirely from the environment.
///
/// Missing provider credentials are a startup-fatal condition, never a
/// per-request error.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the persisted vector store
    pub data_dir: PathBuf,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub dimension: usize,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Default number of neighbors returned by a query
    pub top_k: usize,
    /// Bound on concurrent embedding calls during ingestion
    pub embed_concurrency: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("Invalid URL in {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("Invalid number in {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("Invalid chunk size: {0} (must be between 1 and 65536)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top-k: {0} (must be between 1 and 1000)")]
    InvalidTopK(usize),
    #[error("Invalid embedding concurrency: {0} (must be between 1 and 64)")]
    InvalidConcurrency(usize),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(usize),
    #[error("Could not determine a data directory; set RAG_DATA_DIR")]
    DirectoryError,
}

impl From<ConfigError> for RagError {
    #[inline]
    fn from(err: ConfigError) -> Self {
        RagError::Config(err.to_string())
    }
}

impl Config {
    /// Load configuration from the process environment
    #[inline]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|var| env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// `from_env` delegates here; tests supply a map-backed lookup so they
    /// never mutate process-global state.
    #[inline]
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match lookup("RAG_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or(ConfigError::DirectoryError)?
                .join("corpus-rag"),
        };

        let embedding = EmbeddingConfig {
            api_key: require(lookup, "OPENAI_API_KEY")?,
            base_url: parse_url(lookup, "OPENAI_BASE_URL", "https://api.openai.com")?,
            model: lookup("RAG_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            dimension: parse_number(
                lookup,
                "RAG_EMBEDDING_DIMENSION",
                DEFAULT_EMBEDDING_DIMENSION,
            )?,
        };

        let generation = GenerationConfig {
            api_key: require(lookup, "ANTHROPIC_API_KEY")?,
            base_url: parse_url(lookup, "ANTHROPIC_BASE_URL", "https://api.anthropic.com")?,
            model: lookup("RAG_GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            max_tokens: 4096,
        };

        let defaults = ChunkingConfig::default();
        let chunking = ChunkingConfig {
            separator: lookup("RAG_CHUNK_SEPARATOR").unwrap_or(defaults.separator),
            max_size: parse_number(lookup, "RAG_CHUNK_SIZE", defaults.max_size)?,
            overlap: parse_number(lookup, "RAG_CHUNK_OVERLAP", defaults.overlap)?,
        };

        let retrieval = RetrievalConfig {
            top_k: parse_number(lookup, "RAG_TOP_K", DEFAULT_TOP_K)?,
            embed_concurrency: parse_number(
                lookup,
                "RAG_EMBED_CONCURRENCY",
                DEFAULT_EMBED_CONCURRENCY,
            )?,
        };

        let config = Self {
            data_dir,
            embedding,
            generation,
            chunking,
            retrieval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Path of the LanceDB directory under the data dir
    #[inline]
    pub fn vector_db_path(&self) -> PathBuf {
        self.data_dir.join("vectors")
    }

    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.chunking.max_size == 0 || self.chunking.max_size > 65536 {
            return Err(ConfigError::InvalidChunkSize(self.chunking.max_size));
        }
        if self.chunking.overlap >= self.chunking.max_size {
            return Err(ConfigError::OverlapTooLarge(
                self.chunking.overlap,
                self.chunking.max_size,
            ));
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_k > 1000 {
            return Err(ConfigError::InvalidTopK(self.retrieval.top_k));
        }
        if self.retrieval.embed_concurrency == 0 || self.retrieval.embed_concurrency > 64 {
            return Err(ConfigError::InvalidConcurrency(
                self.retrieval.embed_concurrency,
            ));
        }
        if !(64..=4096).contains(&self.embedding.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding.dimension,
            ));
        }
        Ok(())
    }
}

fn require(lookup: &dyn Fn(&str) -> Option<String>, var: &'static str) -> Result<String> {
    lookup(var)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(var).into())
}

fn parse_url(
    lookup: &dyn Fn(&str) -> Option<String>,
    var: &'static str,
    default: &str,
) -> Result<Url> {
    let value = lookup(var).unwrap_or_else(|| default.to_string());
    Url::parse(&value)
        .map_err(|_| ConfigError::InvalidUrl { var, value }.into())
}

fn parse_number<T: std::str::FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T> {
    match lookup(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }.into()),
        None => Ok(default),
    }
}
