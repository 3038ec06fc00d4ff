//! Turns command-line arguments into engine components.
//!
//! Every constructor here fails fast: a missing credential for the selected
//! provider is reported before anything is served or ingested.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ragchat_model::{GeminiModel, LanguageModel, MockLlm, OpenAICompatibleModel};
use ragchat_rag::milvus::MilvusVectorStore;
use ragchat_rag::openai::OpenAIEmbeddingProvider;
use ragchat_rag::{
    Chunker, ConversationalRag, EmbeddingProvider, FixedSizeChunker, HashingEmbeddingProvider,
    InMemoryVectorStore, IngestionPipeline, LexicalOverlapReranker, RagConfig, RecursiveChunker,
    VectorRetriever, VectorStore,
};
use tracing::info;

use crate::cli::{ChunkerKind, ChunkingArgs, EmbeddingKind, LlmKind, ProviderArgs, StoreKind};

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-4o-mini";

fn required<'a>(value: &'a Option<String>, name: &str, provider: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{name} must be set to use the {provider} provider"),
    }
}

pub fn embedding_provider(args: &ProviderArgs) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = match args.embedding {
        EmbeddingKind::Hashing => {
            let dimensions = args.embedding_dimensions.unwrap_or(1024);
            return Ok(Arc::new(HashingEmbeddingProvider::new(dimensions)));
        }
        EmbeddingKind::Zhipu => {
            let key = required(&args.zhipu_api_key, "ZHIPUAI_API_KEY", "zhipu")?;
            OpenAIEmbeddingProvider::zhipu(key)?
        }
        EmbeddingKind::Openai => {
            let key = required(&args.openai_api_key, "OPENAI_API_KEY", "openai")?;
            let provider = OpenAIEmbeddingProvider::new(key)?;
            match &args.openai_base_url {
                Some(url) => provider.with_base_url(url.as_str()),
                None => provider,
            }
        }
    };

    let provider = match &args.embedding_model {
        Some(model) => provider.with_model(model.as_str()),
        None => provider,
    };
    let provider = match args.embedding_dimensions {
        Some(dims) => provider.with_dimensions(dims),
        None => provider,
    };
    Ok(Arc::new(provider))
}

pub fn language_model(args: &ProviderArgs) -> Result<Arc<dyn LanguageModel>> {
    let model: Arc<dyn LanguageModel> = match args.llm {
        LlmKind::Gemini => {
            let key = required(&args.google_api_key, "GOOGLE_API_KEY", "gemini")?;
            let name = args.chat_model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
            Arc::new(GeminiModel::new(key, name)?)
        }
        LlmKind::Openai => {
            // Local OpenAI-compatible servers (Ollama, vLLM) accept requests without a key.
            let key = args.openai_api_key.clone().unwrap_or_default();
            let name = args.chat_model.as_deref().unwrap_or(DEFAULT_OPENAI_CHAT_MODEL);
            let model = OpenAICompatibleModel::new(key, name)?;
            Arc::new(match &args.openai_base_url {
                Some(url) => model.with_base_url(url.as_str()),
                None => model,
            })
        }
        LlmKind::Mock => Arc::new(MockLlm::new("mock")),
    };
    info!(model = model.name(), "language model ready");
    Ok(model)
}

pub fn vector_store(args: &ProviderArgs) -> Result<Arc<dyn VectorStore>> {
    match args.store {
        StoreKind::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
        StoreKind::Milvus => {
            let store = MilvusVectorStore::new(&args.milvus_url)?;
            Ok(Arc::new(match &args.milvus_token {
                Some(token) => store.with_token(token.as_str()),
                None => store,
            }))
        }
    }
}

pub fn rag_config(providers: &ProviderArgs, chunking: &ChunkingArgs) -> Result<RagConfig> {
    let mut builder = RagConfig::builder()
        .chunk_size(chunking.chunk_size)
        .chunk_overlap(chunking.chunk_overlap)
        .top_k(providers.top_k)
        .embed_batch_size(chunking.embed_batch_size);
    if let Some(threshold) = providers.similarity_threshold {
        builder = builder.similarity_threshold(threshold);
    }
    Ok(builder.build()?)
}

pub fn ingestion_pipeline(
    config: RagConfig,
    chunker: ChunkerKind,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
) -> Result<IngestionPipeline> {
    let chunker: Arc<dyn Chunker> = match chunker {
        ChunkerKind::Fixed => Arc::new(FixedSizeChunker::from_config(&config)),
        ChunkerKind::Recursive => Arc::new(RecursiveChunker::from_config(&config)),
    };
    IngestionPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(store)
        .chunker(chunker)
        .build()
        .context("invalid ingestion settings")
}

pub fn conversational_rag(
    args: &ProviderArgs,
    config: &RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
) -> Result<ConversationalRag> {
    let mut retriever = VectorRetriever::new(embedder, store, args.collection.clone())
        .with_similarity_threshold(config.similarity_threshold);
    if args.rerank {
        retriever = retriever.with_reranker(Arc::new(LexicalOverlapReranker::default()));
    }

    Ok(ConversationalRag::builder()
        .language_model(language_model(args)?)
        .retriever(Arc::new(retriever))
        .config(config)
        .build()?)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn providers(args: &[&str]) -> ProviderArgs {
        let mut argv = vec!["ragchat"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["ask", "q"]);
        Cli::try_parse_from(argv).unwrap().providers
    }

    #[test]
    fn missing_zhipu_key_fails_fast() {
        let mut args = providers(&["--embedding", "zhipu"]);
        args.zhipu_api_key = None;
        let err = embedding_provider(&args).err().unwrap();
        assert!(err.to_string().contains("ZHIPUAI_API_KEY"));
    }

    #[test]
    fn missing_google_key_fails_fast() {
        let mut args = providers(&["--llm", "gemini"]);
        args.google_api_key = Some("  ".into());
        assert!(language_model(&args).is_err());
    }

    #[test]
    fn offline_providers_need_no_credentials() {
        let args = providers(&["--embedding", "hashing", "--llm", "mock", "--store", "memory"]);
        assert_eq!(embedding_provider(&args).unwrap().dimensions(), 1024);
        assert_eq!(language_model(&args).unwrap().name(), "mock");
        assert!(vector_store(&args).is_ok());
    }

    #[test]
    fn invalid_chunking_is_a_config_error() {
        let args = providers(&[]);
        let chunking = ChunkingArgs {
            chunk_size: 10,
            chunk_overlap: 10,
            chunker: ChunkerKind::Fixed,
            embed_batch_size: 1,
        };
        assert!(rag_config(&args, &chunking).is_err());
    }
}
