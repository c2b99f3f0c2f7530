use clap::{Parser, Subcommand};
use corpus_rag::commands::{delete_index, head, list_indexes, load, query};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "corpus-rag")]
#[command(about = "A retrieval-augmented question answering system over local documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed, and store a document file
    Load {
        /// Path to the document to ingest
        file_path: PathBuf,
    },
    /// Answer a question from the stored corpus
    Query {
        /// The question to answer
        question: String,
        /// Number of passages to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show the first few stored records
    Head {
        /// Maximum number of records to show
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// List similarity indexes on the store
    ListIndexes,
    /// Drop a similarity index by name
    DeleteIndex {
        /// Name of the index to drop
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load { file_path } => {
            load(&file_path).await?;
        }
        Commands::Query { question, top_k } => {
            query(&question, top_k).await?;
        }
        Commands::Head { limit } => {
            head(limit).await?;
        }
        Commands::ListIndexes => {
            list_indexes().await?;
        }
        Commands::DeleteIndex { name } => {
            delete_index(&name).await?;
        }
    }

    Ok(())
}
