//! # ragchat-rag
//!
//! Conversational retrieval-augmented generation over a vector store.
//!
//! ## Overview
//!
//! Two flows share the same embedding provider and collection:
//!
//! - **Ingestion** ([`IngestionPipeline`]): chunk documents, drop and recreate
//!   the collection, then embed and store one record per chunk.
//! - **Chat** ([`ConversationalRag`]): rewrite a follow-up question into a
//!   standalone one ([`QueryRewriter`]), retrieve the top passages
//!   ([`Retriever`]), and answer from them ([`AnswerSynthesizer`]) or refuse.
//!
//! Backends plug in through traits:
//!
//! - [`EmbeddingProvider`] - [`HashingEmbeddingProvider`] locally, or
//!   `openai::OpenAIEmbeddingProvider` (OpenAI, Zhipu) with the `openai` feature
//! - [`VectorStore`] - [`InMemoryVectorStore`], or `milvus::MilvusVectorStore`
//!   with the `milvus` feature
//! - [`Reranker`] - optional rescoring after vector search
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragchat_model::MockLlm;
//! use ragchat_rag::*;
//!
//! let embedder = Arc::new(HashingEmbeddingProvider::default());
//! let store = Arc::new(InMemoryVectorStore::new());
//!
//! let pipeline = IngestionPipeline::builder()
//!     .embedding_provider(embedder.clone())
//!     .vector_store(store.clone())
//!     .build()?;
//! pipeline.ingest("docs", &[Document::new("poem", "长安一片月，万户捣衣声")]).await?;
//!
//! let rag = ConversationalRag::builder()
//!     .language_model(Arc::new(MockLlm::new("mock")))
//!     .retriever(Arc::new(VectorRetriever::new(embedder, store, "docs")))
//!     .build()?;
//! let answer = rag.ask("月亮").await?;
//! ```
//!
//! ## Features
//!
//! - `openai` - OpenAI-compatible embeddings (OpenAI, Zhipu `embedding-2`)
//! - `milvus` - Milvus vector store over the v2 REST API

pub mod chat;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod history;
pub mod inmemory;
pub mod ingest;
#[cfg(feature = "milvus")]
pub mod milvus;
#[cfg(feature = "openai")]
pub mod openai;
pub mod reranker;
pub mod retriever;
pub mod rewriter;
pub mod synthesizer;
pub mod vectorstore;

pub use chat::{ChatOutcome, ChatRequest, ChatResponse, ChatStage, ConversationalRag, ConversationalRagBuilder};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, NewRecord, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result, Stage};
pub use hashing::HashingEmbeddingProvider;
pub use history::{ConversationHistory, ConversationTurn, Speaker};
pub use inmemory::InMemoryVectorStore;
pub use ingest::{IngestionPipeline, IngestionPipelineBuilder};
#[cfg(feature = "milvus")]
pub use milvus::MilvusVectorStore;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use reranker::{LexicalOverlapReranker, Reranker};
pub use retriever::{Retriever, VectorRetriever};
pub use rewriter::{DEFAULT_REWRITE_INSTRUCTION, LlmQueryRewriter, QueryRewriter};
pub use synthesizer::{AnswerSynthesizer, DEFAULT_REFUSAL_TEXT, PromptTemplate};
pub use vectorstore::VectorStore;
