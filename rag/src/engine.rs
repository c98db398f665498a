//! C6 RAG Engine (spec.md §4.6): index, search, and context assembly over
//! the chunker, embedding gateway, and vector index ports.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use conhub_models::chunk::{VectorRecord, VectorRecordPayload};
use conhub_ports::embedding::EmbeddingModelPort;
use conhub_ports::vector_index::{MetadataFilter, ScoredRecord, VectorIndexPort};
use conhub_ports::PortResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chunker::{chunk, ChunkerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResult {
    pub source_id: Uuid,
    pub chunks_created: usize,
    pub vector_ids: Vec<Uuid>,
    pub collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchConfig {
    pub collection: String,
    pub top_k: usize,
    pub score_threshold: f32,
    pub metadata_filter: Option<MetadataFilter>,
    pub deduplicate: bool,
    pub mmr: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub chunk_id: Uuid,
    pub source_id: Uuid,
    pub content: String,
    pub score: f32,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagContext {
    pub results: Vec<SearchResultItem>,
    pub rendered_text: String,
}

/// Default budget: ~3000 tokens * 4 chars/token.
const DEFAULT_CONTEXT_CHAR_BUDGET: usize = 3000 * 4;

pub struct RagEngine {
    embedding: Arc<dyn EmbeddingModelPort>,
    vector_index: Arc<dyn VectorIndexPort>,
}

impl RagEngine {
    pub fn new(embedding: Arc<dyn EmbeddingModelPort>, vector_index: Arc<dyn VectorIndexPort>) -> Self {
        Self { embedding, vector_index }
    }

    /// `index_document`: chunk, embed as one batch, upsert, return ordered
    /// vector_ids (§4.6 step 1-5).
    pub async fn index_document(
        &self,
        source_id: Uuid,
        content: &str,
        source_metadata: HashMap<String, serde_json::Value>,
        collection: &str,
        chunking_config: &ChunkerConfig,
    ) -> PortResult<IndexResult> {
        let chunks = chunk(source_id, content, chunking_config)
            .map_err(|e| conhub_ports::PortError::invalid(e.to_string()))?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;

        self.vector_index.ensure_collection(collection, self.embedding.dimension()).await?;

        let now = Utc::now();
        let mut records = Vec::with_capacity(chunks.len());
        for (piece, embedding) in chunks.iter().zip(embeddings.into_iter()) {
            let mut metadata = source_metadata.clone();
            metadata.insert("total_chunks".into(), serde_json::json!(piece.total_chunks));
            metadata.insert("start_offset".into(), serde_json::json!(piece.start_offset));
            metadata.insert("end_offset".into(), serde_json::json!(piece.end_offset));
            metadata.insert("created_at".into(), serde_json::json!(now.to_rfc3339()));
            if let Some(category) = &piece.category {
                metadata.insert("category".into(), serde_json::json!(category));
            }
            if !piece.tags.is_empty() {
                metadata.insert("tags".into(), serde_json::json!(piece.tags));
            }

            records.push(VectorRecord {
                id: Uuid::new_v4(),
                embedding,
                payload: VectorRecordPayload {
                    content: piece.content.clone(),
                    source_id,
                    chunk_index: piece.chunk_index,
                    collection: collection.to_string(),
                    metadata,
                },
            });
        }

        let vector_ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        self.vector_index.upsert(collection, records).await?;

        Ok(IndexResult {
            source_id,
            chunks_created: chunks.len(),
            vector_ids,
            collection: collection.to_string(),
        })
    }

    /// `search`: embed query, call C3 with an inflated top_k when
    /// deduplicating, cap 2 chunks per source, round-robin by source when
    /// mmr is requested, then truncate to top_k (§4.6).
    pub async fn search(&self, query: &str, config: &SearchConfig) -> PortResult<Vec<SearchResultItem>> {
        let query_vector = self.embedding.embed(query).await?;
        let inflated_top_k = config.top_k * if config.deduplicate { 2 } else { 1 };

        let scored = self
            .vector_index
            .search(
                &config.collection,
                &query_vector,
                inflated_top_k,
                config.score_threshold,
                config.metadata_filter.as_ref(),
            )
            .await?;

        let deduped = if config.deduplicate { dedup_by_source(scored) } else { scored };

        let ordered = if config.mmr { round_robin_by_source(deduped) } else { deduped };

        Ok(ordered
            .into_iter()
            .take(config.top_k)
            .map(ScoredRecord::into_search_result)
            .collect())
    }

    /// `build_context`: search, then render a numbered, source-cited text
    /// block, truncating from the tail to fit the character budget (§4.6).
    pub async fn build_context(&self, query: &str, config: &SearchConfig) -> PortResult<RagContext> {
        let results = self.search(query, config).await?;
        let rendered_text = render_context(&results, DEFAULT_CONTEXT_CHAR_BUDGET);
        Ok(RagContext { results, rendered_text })
    }

    /// `delete_document`: removes every vector with metadata.source_id =
    /// source_id.
    pub async fn delete_document(&self, collection: &str, source_id: Uuid) -> PortResult<()> {
        let filter = MetadataFilter::new().with("source_id", serde_json::json!(source_id.to_string()));
        self.vector_index.delete_by_filter(collection, filter).await
    }
}

trait IntoSearchResult {
    fn into_search_result(self) -> SearchResultItem;
}

impl IntoSearchResult for ScoredRecord {
    fn into_search_result(self) -> SearchResultItem {
        SearchResultItem {
            chunk_id: self.record.id,
            source_id: self.record.payload.source_id,
            content: self.record.payload.content,
            score: self.score,
            metadata: self.record.payload.metadata,
        }
    }
}

/// Caps at 2 chunks per source_id, preserving score order (results already
/// arrive sorted descending by score from the index).
fn dedup_by_source(records: Vec<ScoredRecord>) -> Vec<ScoredRecord> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        let count = counts.entry(record.record.payload.source_id).or_insert(0);
        if *count < 2 {
            *count += 1;
            kept.push(record);
        }
    }
    kept
}

/// Reorders by round-robin across source_ids to maximize source diversity;
/// the required baseline, with full MMR left as an optional future path.
fn round_robin_by_source(records: Vec<ScoredRecord>) -> Vec<ScoredRecord> {
    let mut by_source: HashMap<Uuid, Vec<ScoredRecord>> = HashMap::new();
    let mut order: Vec<Uuid> = Vec::new();
    for record in records {
        let source_id = record.record.payload.source_id;
        if !by_source.contains_key(&source_id) {
            order.push(source_id);
        }
        by_source.entry(source_id).or_default().push(record);
    }

    let mut result = Vec::new();
    loop {
        let mut added_any = false;
        for source_id in &order {
            if let Some(bucket) = by_source.get_mut(source_id) {
                if !bucket.is_empty() {
                    result.push(bucket.remove(0));
                    added_any = true;
                }
            }
        }
        if !added_any {
            break;
        }
    }
    result
}

fn render_context(results: &[SearchResultItem], char_budget: usize) -> String {
    let mut rendered = String::new();
    for (index, result) in results.iter().enumerate() {
        let entry = format!("[{}] {}\n\n", index + 1, result.content);
        if rendered.len() + entry.len() > char_budget {
            break;
        }
        rendered.push_str(&entry);
    }
    rendered.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(source_id: Uuid, score: f32, content: &str) -> ScoredRecord {
        ScoredRecord {
            record: VectorRecord {
                id: Uuid::new_v4(),
                embedding: vec![0.1, 0.2],
                payload: VectorRecordPayload {
                    content: content.to_string(),
                    source_id,
                    chunk_index: 0,
                    collection: "default".to_string(),
                    metadata: HashMap::new(),
                },
            },
            score,
        }
    }

    #[test]
    fn dedup_caps_two_chunks_per_source() {
        let source = Uuid::new_v4();
        let records = vec![
            make_record(source, 0.9, "a"),
            make_record(source, 0.8, "b"),
            make_record(source, 0.7, "c"),
        ];
        let deduped = dedup_by_source(records);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn round_robin_interleaves_sources() {
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let records = vec![
            make_record(s1, 0.9, "a1"),
            make_record(s1, 0.8, "a2"),
            make_record(s2, 0.7, "b1"),
        ];
        let ordered = round_robin_by_source(records);
        assert_eq!(ordered[0].record.payload.source_id, s1);
        assert_eq!(ordered[1].record.payload.source_id, s2);
        assert_eq!(ordered[2].record.payload.source_id, s1);
    }

    #[test]
    fn render_context_truncates_from_tail() {
        let results = vec![
            SearchResultItem { chunk_id: Uuid::new_v4(), source_id: Uuid::new_v4(), content: "x".repeat(20), score: 0.9, metadata: HashMap::new() },
            SearchResultItem { chunk_id: Uuid::new_v4(), source_id: Uuid::new_v4(), content: "y".repeat(20), score: 0.8, metadata: HashMap::new() },
        ];
        let rendered = render_context(&results, 30);
        assert!(rendered.contains("[1]"));
        assert!(!rendered.contains("[2]"));
    }
}
