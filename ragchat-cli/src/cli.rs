//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Conversational question answering over your own documents.
#[derive(Parser, Debug)]
#[command(name = "ragchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub providers: ProviderArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild the collection from text files (drops existing vectors)
    Ingest {
        /// UTF-8 text files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },

    /// Serve the chat API over HTTP
    Serve {
        #[arg(long, env = "RAGCHAT_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "RAGCHAT_PORT", default_value_t = 8000)]
        port: u16,

        /// Ingest these files before serving (needed with `--store memory`)
        #[arg(long = "ingest", value_name = "FILE")]
        ingest: Vec<PathBuf>,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },

    /// Ask one question without conversation history
    Ask {
        question: String,

        /// Ingest these files first (needed with `--store memory`)
        #[arg(long = "ingest", value_name = "FILE")]
        ingest: Vec<PathBuf>,

        /// Also print the retrieved passages
        #[arg(short, long)]
        verbose: bool,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },
}

/// Backends and retrieval settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    #[arg(long, global = true, env = "RAGCHAT_EMBEDDING", value_enum, default_value_t = EmbeddingKind::Zhipu)]
    pub embedding: EmbeddingKind,

    /// Override the embedding model name
    #[arg(long, global = true, env = "RAGCHAT_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Override the embedding dimensionality (requires a model that supports it)
    #[arg(long, global = true, env = "RAGCHAT_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    #[arg(long, global = true, env = "RAGCHAT_LLM", value_enum, default_value_t = LlmKind::Gemini)]
    pub llm: LlmKind,

    /// Override the chat model name
    #[arg(long, global = true, env = "RAGCHAT_CHAT_MODEL")]
    pub chat_model: Option<String>,

    #[arg(long, global = true, env = "RAGCHAT_STORE", value_enum, default_value_t = StoreKind::Milvus)]
    pub store: StoreKind,

    #[arg(long, global = true, env = "RAGCHAT_COLLECTION", default_value = "my_rag_collection_manual")]
    pub collection: String,

    #[arg(long, global = true, env = "MILVUS_URL", default_value = "http://127.0.0.1:19530")]
    pub milvus_url: String,

    #[arg(long, global = true, env = "MILVUS_TOKEN", hide_env_values = true)]
    pub milvus_token: Option<String>,

    #[arg(long, global = true, env = "ZHIPUAI_API_KEY", hide_env_values = true)]
    pub zhipu_api_key: Option<String>,

    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API (GLM, DeepSeek, Ollama, vLLM)
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Number of passages retrieved per question
    #[arg(long, global = true, env = "RAGCHAT_TOP_K", default_value_t = 3)]
    pub top_k: usize,

    /// Drop passages scoring below this value
    #[arg(long, global = true, env = "RAGCHAT_SIMILARITY_THRESHOLD")]
    pub similarity_threshold: Option<f32>,

    /// Rescore passages by character overlap with the question
    #[arg(long, global = true)]
    pub rerank: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkingArgs {
    #[arg(long, env = "RAGCHAT_CHUNK_SIZE", default_value_t = 512)]
    pub chunk_size: usize,

    #[arg(long, env = "RAGCHAT_CHUNK_OVERLAP", default_value_t = 100)]
    pub chunk_overlap: usize,

    #[arg(long, value_enum, default_value_t = ChunkerKind::Fixed)]
    pub chunker: ChunkerKind,

    /// Chunks embedded per request
    #[arg(long, env = "RAGCHAT_EMBED_BATCH_SIZE", default_value_t = 1)]
    pub embed_batch_size: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingKind {
    /// Zhipu AI `embedding-2` (ZHIPUAI_API_KEY)
    Zhipu,
    /// OpenAI or another OpenAI-compatible endpoint (OPENAI_API_KEY)
    Openai,
    /// Local feature hashing, no network
    Hashing,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LlmKind {
    /// Google Gemini (GOOGLE_API_KEY)
    Gemini,
    /// OpenAI-compatible chat completions (OPENAI_API_KEY, OPENAI_BASE_URL)
    Openai,
    /// Echoes the question, for offline smoke tests
    Mock,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Milvus,
    /// Process-local store, lost on exit
    Memory,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChunkerKind {
    Fixed,
    Recursive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_with_memory_store_and_seed_files() {
        let cli = Cli::try_parse_from([
            "ragchat",
            "--store",
            "memory",
            "--embedding",
            "hashing",
            "serve",
            "--port",
            "9000",
            "--ingest",
            "data/simple.txt",
        ])
        .unwrap();

        assert_eq!(cli.providers.store, StoreKind::Memory);
        assert_eq!(cli.providers.embedding, EmbeddingKind::Hashing);
        match cli.command {
            Command::Serve { port, ingest, .. } => {
                assert_eq!(port, 9000);
                assert_eq!(ingest, [PathBuf::from("data/simple.txt")]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ingest_requires_files() {
        assert!(Cli::try_parse_from(["ragchat", "ingest"]).is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["ragchat", "ask", "月亮", "--llm", "mock", "--top-k", "5"]).unwrap();
        assert_eq!(cli.providers.llm, LlmKind::Mock);
        assert_eq!(cli.providers.top_k, 5);
    }
}
