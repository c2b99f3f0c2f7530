use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Degenerate embedding: vector has zero norm")]
    DegenerateEmbedding,

    #[error("Answer synthesis error: {0}")]
    Synthesis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

mod http;

pub mod chunking;
pub mod commands;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod pipeline;
pub mod retriever;
pub mod store;
pub mod synthesis;
