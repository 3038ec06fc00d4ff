//! Document ingestion: chunk → drop/recreate collection → embed → store.
//!
//! The [`IngestionPipeline`] rebuilds a collection from scratch on every run.
//! If the collection already exists it is dropped first, so re-running an
//! ingestion never leaves stale or duplicate vectors behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragchat_rag::{IngestionPipeline, RagConfig, InMemoryVectorStore, FixedSizeChunker};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(FixedSizeChunker::new(24, 1)))
//!     .build()?;
//!
//! let written = pipeline.ingest_files("my_rag_collection_manual", &["data/simple.txt"]).await?;
//! ```
//!
//! Runs are not safe to execute concurrently against the same collection
//! name: both would drop and recreate it. Serialize ingestion jobs externally.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, NewRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Writes documents into a freshly rebuilt vector store collection.
///
/// Chunks are embedded `embed_batch_size` at a time (one request per chunk by
/// default) and each chunk becomes exactly one record, written in chunk
/// order. The first embedding or store failure aborts the run; records
/// written before it stay in the collection.
pub struct IngestionPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Split documents into chunks, preserving document and chunk order.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunker.chunk(document)).collect()
    }

    /// Load UTF-8 text files and ingest them. Each path becomes a document id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] if a file cannot be read, plus
    /// everything [`ingest`](Self::ingest) can return.
    pub async fn ingest_files<P: AsRef<Path>>(&self, collection: &str, paths: &[P]) -> Result<usize> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let document = Document::load(path).await.map_err(|e| {
                error!(path = %path.as_ref().display(), error = %e, "failed to load document");
                RagError::IngestionError(e.to_string())
            })?;
            documents.push(document);
        }
        self.ingest(collection, &documents).await
    }

    /// Rebuild `collection` from `documents` and return the number of records written.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] if dropping or creating the
    /// collection fails, or if embedding or storing any chunk fails. The error
    /// names the position of the failing chunk.
    pub async fn ingest(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        // 1. Chunk every document up front
        let chunks = self.chunk_documents(documents);
        let total = chunks.len();
        info!(collection, documents = documents.len(), chunk_count = total, "chunked documents");

        // 2. Drop the previous collection, if any
        let exists = self.vector_store.has_collection(collection).await.map_err(|e| {
            error!(collection, error = %e, "failed to check collection");
            RagError::IngestionError(format!("failed to check collection '{collection}': {e}"))
        })?;
        if exists {
            warn!(collection, "collection exists, dropping it before rebuild");
            self.vector_store.drop_collection(collection).await.map_err(|e| {
                error!(collection, error = %e, "failed to drop collection");
                RagError::IngestionError(format!("failed to drop collection '{collection}': {e}"))
            })?;
        }

        // 3. Create an empty collection
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(collection, dimensions).await.map_err(|e| {
            error!(collection, error = %e, "failed to create collection");
            RagError::IngestionError(format!("failed to create collection '{collection}': {e}"))
        })?;

        // 4. Embed and store, one record per chunk, in order
        let mut written = 0;
        for batch in chunks.chunks(self.config.embed_batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(collection, chunk_index = written, error = %e, "embedding failed during ingestion");
                RagError::IngestionError(format!(
                    "embedding failed at chunk {}/{total}: {e}",
                    written + 1
                ))
            })?;
            if embeddings.len() != batch.len() {
                return Err(RagError::IngestionError(format!(
                    "embedding provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                let id = self
                    .vector_store
                    .add_record(collection, NewRecord::from_chunk(chunk, embedding))
                    .await
                    .map_err(|e| {
                        error!(collection, chunk.id = %chunk.id, error = %e, "store failed during ingestion");
                        RagError::IngestionError(format!(
                            "storing chunk {}/{total} ('{}') failed: {e}",
                            written + 1,
                            chunk.id
                        ))
                    })?;
                written += 1;
                info!(collection, record.id = %id, written, total, "stored chunk");
            }
        }

        info!(collection, record_count = written, "ingestion completed");
        Ok(written)
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `embedding_provider` and `vector_store` are required. Without an explicit
/// chunker, a [`FixedSizeChunker`] sized from the config is used.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`IngestionPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// config is invalid.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::from_config(&config)),
        };

        Ok(IngestionPipeline { config, embedding_provider, vector_store, chunker })
    }
}
