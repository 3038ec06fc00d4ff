//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] - splits by character count with verbatim overlap
//! - [`RecursiveChunker`] - splits by paragraphs, lines, sentences, clauses, then characters
//!
//! Sizes are counted in characters (Unicode scalar values), so CJK text is
//! measured the same way as Latin text and never split inside a code point.

use std::collections::VecDeque;

use crate::config::RagConfig;
use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks, in document order.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size windows by character count.
///
/// Consecutive chunks share exactly `chunk_overlap` characters: the tail of
/// one chunk is repeated verbatim at the head of the next. Every chunk has
/// `chunk_size` characters except possibly the last, which ends at the end of
/// the document. Removing the first `chunk_overlap` characters from every
/// chunk but the first and concatenating reproduces the document.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(24, 1);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// A zero `chunk_size` is treated as 1 and `chunk_overlap` is clamped to
    /// `chunk_size - 1`; use [`RagConfig::validate`] to reject such values up front.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let pieces = split_by_size(&document.text, self.chunk_size, self.chunk_overlap);
        into_chunks(document, pieces)
    }
}

/// Character-window splitting with verbatim overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character boundary, including the end of the text.
    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let total = boundaries.len() - 1;
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut pieces = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(total);
        pieces.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == total {
            break;
        }
        start += step;
    }
    pieces
}

fn into_chunks(document: &Document, pieces: Vec<String>) -> Vec<Chunk> {
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = document.metadata.clone();
            metadata.insert("chunk_index".to_string(), i.to_string());
            Chunk {
                id: format!("{}_{i}", document.id),
                text,
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

/// Separators tried in order, coarsest first.
const SEPARATORS: &[&str] =
    &["\n\n", "\n", "。", "！", "？", "；", ". ", "! ", "? ", "，", ", ", " "];

/// Splits text hierarchically: paragraphs → lines → sentences → clauses → characters.
///
/// Text is cut at the coarsest separator that yields pieces no longer than
/// `chunk_size`; pieces are then merged back into chunks of at most
/// `chunk_size` characters. When a chunk is closed, trailing pieces totalling
/// at most `chunk_overlap` characters are carried into the next one.
/// Separators stay attached to the text before them and chunks are trimmed.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(24, 1);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Break text into pieces of at most `chunk_size` characters, using the
/// coarsest separator that works and falling back to raw character windows.
fn split_pieces(text: &str, chunk_size: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }
    let Some((separator, rest)) = separators.split_first() else {
        return split_by_size(text, chunk_size, 0);
    };

    let mut pieces = Vec::new();
    for segment in split_keeping_separator(text, separator) {
        if char_len(segment) <= chunk_size {
            pieces.push(segment.to_string());
        } else {
            pieces.extend(split_pieces(segment, chunk_size, rest));
        }
    }
    pieces
}

/// Merge small pieces into chunks, carrying up to `chunk_overlap` characters forward.
fn merge_pieces(pieces: Vec<String>, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(String, usize)> = VecDeque::new();
    let mut window_len = 0;

    for piece in pieces {
        let piece_len = char_len(&piece);
        if window_len + piece_len > chunk_size && !window.is_empty() {
            chunks.push(window.iter().map(|(text, _)| text.as_str()).collect::<String>());
            while window_len > chunk_overlap || (window_len > 0 && window_len + piece_len > chunk_size)
            {
                if let Some((_, len)) = window.pop_front() {
                    window_len -= len;
                }
            }
        }
        window.push_back((piece, piece_len));
        window_len += piece_len;
    }

    if !window.is_empty() {
        chunks.push(window.iter().map(|(text, _)| text.as_str()).collect::<String>());
    }

    chunks
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = split_pieces(&document.text, self.chunk_size, SEPARATORS);
        let merged = merge_pieces(pieces, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();

        into_chunks(document, merged)
    }
}
