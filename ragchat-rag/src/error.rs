//! Error types for the `ragchat-rag` crate.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The step of a chat request that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// History-aware query reformulation.
    Rewrite,
    /// Embedding the question and searching the vector store.
    Retrieve,
    /// Answer synthesis.
    Synthesize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Rewrite => "rewrite",
            Stage::Retrieve => "retrieve",
            Stage::Synthesize => "synthesize",
        })
    }
}

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document loading or chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An ingestion run was aborted. Records written before the failure remain.
    #[error("Ingestion error: {0}")]
    IngestionError(String),

    /// The retrieval step failed (store unreachable, query failed, empty collection).
    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    /// A language model call failed during rewriting or synthesis.
    #[error("Generation error ({stage}): {message}")]
    GenerationError {
        /// The stage whose model call failed.
        stage: Stage,
        /// A description of the failure.
        message: String,
    },

    /// The request itself was malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RagError {
    /// The chat stage this error belongs to, if it came from a chat request.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RagError::GenerationError { stage, .. } => Some(*stage),
            RagError::RetrievalError(_) => Some(Stage::Retrieve),
            _ => None,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
