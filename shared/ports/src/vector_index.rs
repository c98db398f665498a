use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use conhub_models::chunk::VectorRecord;

use crate::PortResult;

#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    /// Conjunction of exact-match clauses over payload fields (§4.3).
    pub equals: HashMap<String, serde_json::Value>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.equals.insert(field.into(), value);
        self
    }

    pub fn matches(&self, payload_metadata: &HashMap<String, serde_json::Value>) -> bool {
        self.equals.iter().all(|(k, v)| payload_metadata.get(k) == Some(v))
    }
}

#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct PayloadPatch {
    pub set: HashMap<String, serde_json::Value>,
}

/// C3 Vector Index Adapter port: upsert/search/scroll/delete over a
/// cosine-metric ANN index with metadata filters.
#[async_trait]
pub trait VectorIndexPort: Send + Sync {
    async fn ensure_collection(&self, collection: &str, dim: usize) -> PortResult<()>;

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> PortResult<()>;

    /// Results sorted by score descending, ties broken by insertion order
    /// (stable); `score_threshold` filters before ordering (§4.3).
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: f32,
        metadata_filter: Option<&MetadataFilter>,
    ) -> PortResult<Vec<ScoredRecord>>;

    async fn scroll(
        &self,
        collection: &str,
        cursor: Option<String>,
        limit: usize,
        metadata_filter: Option<&MetadataFilter>,
    ) -> PortResult<(Vec<VectorRecord>, Option<String>)>;

    async fn get(&self, collection: &str, id: Uuid) -> PortResult<Option<VectorRecord>>;

    async fn update_payload(&self, collection: &str, id: Uuid, patch: PayloadPatch) -> PortResult<()>;

    async fn delete_ids(&self, collection: &str, ids: &[Uuid]) -> PortResult<()>;

    async fn delete_by_filter(&self, collection: &str, filter: MetadataFilter) -> PortResult<()>;

    async fn list_collections(&self) -> PortResult<Vec<String>>;

    async fn health(&self) -> PortResult<()>;
}
