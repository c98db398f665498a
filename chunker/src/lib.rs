//! C1 Chunker: splits text into overlapping, semantically bounded pieces
//! (spec.md §4.1).

pub mod config;
pub mod strategy;

pub use config::{ChunkerConfig, ChunkingStrategy};

use chrono::Utc;
use conhub_models::chunk::Chunk;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("invalid chunker config: {0}")]
    InvalidConfig(String),
    #[error("empty input text")]
    EmptyInput,
}

/// `chunk(text, config) -> ordered list of Chunk`.
pub fn chunk(
    source_document_id: Uuid,
    text: &str,
    config: &ChunkerConfig,
) -> Result<Vec<Chunk>, ChunkerError> {
    config.validate()?;
    if text.trim().is_empty() {
        return Err(ChunkerError::EmptyInput);
    }

    let pieces = strategy::split(text, config);
    let now = Utc::now();

    let mut chunks = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let trimmed = piece.content.trim();
        if trimmed.len() < config.min_chunk_size {
            continue;
        }
        let leading_trim = piece.content.len() - piece.content.trim_start().len();
        let start = piece.start_offset + leading_trim;
        let end = start + trimmed.len();
        chunks.push(Chunk {
            content: trimmed.to_string(),
            source_document_id,
            chunk_index: 0, // assigned below, after filtering
            total_chunks: 0,
            start_offset: start,
            end_offset: end,
            category: None,
            tags: Vec::new(),
            created_at: now,
            source_metadata: Default::default(),
        });
    }

    let total_chunks = chunks.len();
    for (index, c) in chunks.iter_mut().enumerate() {
        c.chunk_index = index;
        c.total_chunks = total_chunks;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_indices_are_contiguous_and_zero_based() {
        let text = "a. ".repeat(400);
        let config = ChunkerConfig::default();
        let chunks = chunk(Uuid::new_v4(), &text, &config).unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
    }

    #[test]
    fn offsets_strictly_increase() {
        let text = "a. ".repeat(400);
        let config = ChunkerConfig::default();
        let chunks = chunk(Uuid::new_v4(), &text, &config).unwrap();
        for pair in chunks.windows(2) {
            assert!(pair[0].start_offset < pair[1].start_offset);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let config = ChunkerConfig::default();
        assert!(chunk(Uuid::new_v4(), "   ", &config).is_err());
    }

    #[test]
    fn round_trip_recovers_text_modulo_whitespace() {
        let text = "The quick brown fox. It jumps over the lazy dog. Again and again it jumps.";
        let mut config = ChunkerConfig::default();
        config.strategy = ChunkingStrategy::Sentence;
        config.chunk_size = 40;
        config.chunk_overlap = 0;
        let chunks = chunk(Uuid::new_v4(), text, &config).unwrap();
        let recovered: String = chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join(" ");
        let normalized_original: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized_recovered: String = recovered.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalized_original, normalized_recovered);
    }
}
