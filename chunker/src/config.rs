use serde::{Deserialize, Serialize};

use crate::ChunkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    Fixed,
    Sentence,
    Markdown,
    Recursive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub strategy: ChunkingStrategy,
    pub min_chunk_size: usize,
    pub separators: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            strategy: ChunkingStrategy::Recursive,
            min_chunk_size: 1,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                ". ".to_string(),
                " ".to_string(),
                "".to_string(),
            ],
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<(), ChunkerError> {
        if !(100..=4000).contains(&self.chunk_size) {
            return Err(ChunkerError::InvalidConfig(format!(
                "chunk_size {} out of range [100, 4000]",
                self.chunk_size
            )));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::InvalidConfig(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        Ok(())
    }
}
