//! Data types for documents, chunks, stored records, and search results.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Source identifier (file path, URL, or caller-chosen name).
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Load a UTF-8 text file. The path becomes the document id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if the file cannot be read or is not UTF-8.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            RagError::ChunkingError(format!("failed to read '{}': {e}", path.display()))
        })?;
        let id = path.display().to_string();
        Ok(Self::new(id.clone(), text).with_metadata("source", id))
    }
}

/// A contiguous segment of a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Identifier of the form `{document_id}_{index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Metadata inherited from the parent document plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A record to be written to a vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRecord {
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: HashMap<String, String>,
}

impl NewRecord {
    /// Pair a chunk with its embedding.
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self { embedding, text: chunk.text.clone(), metadata: chunk.metadata.clone() }
    }
}

/// A retrieved record paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The store-assigned record ID.
    pub id: String,
    /// The stored chunk text.
    pub text: String,
    /// The similarity score (higher is more relevant).
    pub score: f32,
    /// The stored record metadata.
    pub metadata: HashMap<String, String>,
}
