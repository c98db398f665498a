//! Chunk and Vector record (§3 Data Model). The Chunk itself is ephemeral —
//! it only exists as an indexed vector record once persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub source_document_id: Uuid,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub source_metadata: HashMap<String, serde_json::Value>,
}

/// Default embedding dimension used when a collection hasn't pinned one.
pub const DEFAULT_VECTOR_DIM: usize = 768;
pub const MIN_VECTOR_DIM: usize = 256;
pub const DEFAULT_COLLECTION: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecordPayload {
    pub content: String,
    pub source_id: Uuid,
    pub chunk_index: usize,
    pub collection: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: Uuid,
    pub embedding: Vec<f32>,
    pub payload: VectorRecordPayload,
}

impl VectorRecord {
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
