//! C3 Vector Index Adapter: generalizes
//! `services/vector_store.rs`'s `VectorStoreService` (which only covered
//! `ensure_collection`/`upsert`) to the full port surface.

use std::collections::HashMap;

use async_trait::async_trait;
use conhub_models::chunk::{VectorRecord, VectorRecordPayload};
use conhub_ports::vector_index::{MetadataFilter, PayloadPatch, ScoredRecord, VectorIndexPort};
use conhub_ports::{PortError, PortResult};
use qdrant_client::{
    prelude::*,
    qdrant::{
        condition::ConditionOneOf, point_id::PointIdOptions, r#match::MatchValue,
        vectors_config::Config, Condition, CreateCollection, Distance, FieldCondition, Filter,
        Match, PointId, PointStruct, PointsIdsList, PointsSelector, ScrollPoints, SearchPoints,
        SetPayloadPoints, VectorParams, VectorsConfig,
        points_selector::PointsSelectorOneOf,
    },
};
use serde_json::{Map, Value};
use uuid::Uuid;

pub struct QdrantVectorIndex {
    client: QdrantClient,
}

impl QdrantVectorIndex {
    pub async fn connect(url: &str) -> PortResult<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(Self { client })
    }

    fn to_point_struct(record: &VectorRecord) -> PointStruct {
        let mut payload = Map::new();
        payload.insert("content".into(), Value::String(record.payload.content.clone()));
        payload.insert("source_id".into(), Value::String(record.payload.source_id.to_string()));
        payload.insert("chunk_index".into(), Value::from(record.payload.chunk_index));
        payload.insert("collection".into(), Value::String(record.payload.collection.clone()));
        for (k, v) in &record.payload.metadata {
            payload.insert(k.clone(), v.clone());
        }
        PointStruct::new(record.id.to_string(), record.embedding.clone(), payload)
    }

    fn payload_to_metadata(payload: &HashMap<String, qdrant_client::qdrant::Value>) -> HashMap<String, Value> {
        payload
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "content" | "source_id" | "chunk_index" | "collection"))
            .map(|(k, v)| (k.clone(), qdrant_value_to_json(v)))
            .collect()
    }

    fn payload_to_record(id: Uuid, embedding: Vec<f32>, payload: &HashMap<String, qdrant_client::qdrant::Value>) -> VectorRecord {
        let content = payload
            .get("content")
            .map(qdrant_value_to_json)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let source_id = payload
            .get("source_id")
            .and_then(|v| qdrant_value_to_json(v).as_str().and_then(|s| Uuid::parse_str(s).ok()))
            .unwrap_or_default();
        let chunk_index = payload
            .get("chunk_index")
            .and_then(|v| qdrant_value_to_json(v).as_u64())
            .unwrap_or(0) as usize;
        let collection = payload
            .get("collection")
            .and_then(|v| qdrant_value_to_json(v).as_str().map(str::to_string))
            .unwrap_or_default();

        VectorRecord {
            id,
            embedding,
            payload: VectorRecordPayload {
                content,
                source_id,
                chunk_index,
                collection,
                metadata: Self::payload_to_metadata(payload),
            },
        }
    }

    fn to_qdrant_filter(filter: &MetadataFilter) -> Filter {
        let conditions = filter
            .equals
            .iter()
            .map(|(field, value)| Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: field.clone(),
                    r#match: Some(Match { match_value: Some(json_to_match_value(value)) }),
                    ..Default::default()
                })),
            })
            .collect();
        Filter { must: conditions, ..Default::default() }
    }
}

fn qdrant_value_to_json(value: &qdrant_client::qdrant::Value) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn json_to_match_value(value: &Value) -> MatchValue {
    match value {
        Value::String(s) => MatchValue::Keyword(s.clone()),
        Value::Bool(b) => MatchValue::Boolean(*b),
        Value::Number(n) if n.is_i64() => MatchValue::Integer(n.as_i64().unwrap()),
        other => MatchValue::Keyword(other.to_string()),
    }
}

#[async_trait]
impl VectorIndexPort for QdrantVectorIndex {
    async fn ensure_collection(&self, collection: &str, dim: usize) -> PortResult<()> {
        let existing = self
            .client
            .list_collections()
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?
            .collections;
        if existing.iter().any(|c| c.name == collection) {
            return Ok(());
        }
        let req = CreateCollection {
            collection_name: collection.to_string(),
            vectors_config: Some(VectorsConfig {
                config: Some(Config::Params(VectorParams {
                    size: dim as u64,
                    distance: Distance::Cosine.into(),
                    ..Default::default()
                })),
            }),
            ..Default::default()
        };
        self.client
            .create_collection(&req)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> PortResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let points: Vec<PointStruct> = records.iter().map(Self::to_point_struct).collect();
        self.client
            .upsert_points_blocking(collection, None, points, None)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: f32,
        metadata_filter: Option<&MetadataFilter>,
    ) -> PortResult<Vec<ScoredRecord>> {
        let filter = metadata_filter.map(Self::to_qdrant_filter);
        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector: query_vector.to_vec(),
            limit: top_k as u64,
            score_threshold: Some(score_threshold),
            filter,
            with_payload: Some(true.into()),
            with_vectors: Some(true.into()),
            ..Default::default()
        };
        let response = self
            .client
            .search_points(&request)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        // Qdrant already returns results sorted by score descending; ties
        // keep their response order, which is insertion-stable.
        let mut results = Vec::with_capacity(response.result.len());
        for scored in response.result {
            let id = point_id_to_uuid(scored.id.as_ref())?;
            let embedding = scored.vectors.map(extract_dense_vector).unwrap_or_default();
            let record = Self::payload_to_record(id, embedding, &scored.payload);
            results.push(ScoredRecord { record, score: scored.score });
        }
        Ok(results)
    }

    async fn scroll(
        &self,
        collection: &str,
        cursor: Option<String>,
        limit: usize,
        metadata_filter: Option<&MetadataFilter>,
    ) -> PortResult<(Vec<VectorRecord>, Option<String>)> {
        let filter = metadata_filter.map(Self::to_qdrant_filter);
        let offset = cursor
            .and_then(|c| Uuid::parse_str(&c).ok())
            .map(|id| PointId { point_id_options: Some(PointIdOptions::Uuid(id.to_string())) });
        let request = ScrollPoints {
            collection_name: collection.to_string(),
            limit: Some(limit as u32),
            offset,
            filter,
            with_payload: Some(true.into()),
            with_vectors: Some(true.into()),
            ..Default::default()
        };
        let response = self
            .client
            .scroll(&request)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        let next_cursor = response
            .next_page_offset
            .as_ref()
            .and_then(|p| point_id_to_uuid(Some(p)).ok())
            .map(|id| id.to_string());

        let mut records = Vec::with_capacity(response.result.len());
        for point in response.result {
            let id = point_id_to_uuid(point.id.as_ref())?;
            let embedding = point.vectors.map(extract_dense_vector).unwrap_or_default();
            records.push(Self::payload_to_record(id, embedding, &point.payload));
        }
        Ok((records, next_cursor))
    }

    async fn get(&self, collection: &str, id: Uuid) -> PortResult<Option<VectorRecord>> {
        let point_id: PointId = id.to_string().into();
        let response = self
            .client
            .get_points(collection, None, &[point_id], Some(true), Some(true), None)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        let Some(point) = response.result.into_iter().next() else {
            return Ok(None);
        };
        let embedding = point.vectors.map(extract_dense_vector).unwrap_or_default();
        Ok(Some(Self::payload_to_record(id, embedding, &point.payload)))
    }

    async fn update_payload(&self, collection: &str, id: Uuid, patch: PayloadPatch) -> PortResult<()> {
        let mut payload = Map::new();
        for (k, v) in patch.set {
            payload.insert(k, v);
        }
        let point_id: PointId = id.to_string().into();
        let request = SetPayloadPoints {
            collection_name: collection.to_string(),
            payload,
            points_selector: Some(PointsSelector {
                points_selector_one_of: Some(PointsSelectorOneOf::Points(PointsIdsList {
                    ids: vec![point_id],
                })),
            }),
            ..Default::default()
        };
        self.client
            .set_payload(&request)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(())
    }

    async fn delete_ids(&self, collection: &str, ids: &[Uuid]) -> PortResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let points: Vec<PointId> = ids.iter().map(|id| id.to_string().into()).collect();
        let selector = PointsSelector {
            points_selector_one_of: Some(PointsSelectorOneOf::Points(PointsIdsList { ids: points })),
        };
        self.client
            .delete_points(collection, None, &selector, None)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(())
    }

    async fn delete_by_filter(&self, collection: &str, filter: MetadataFilter) -> PortResult<()> {
        let qfilter = Self::to_qdrant_filter(&filter);
        let selector = PointsSelector {
            points_selector_one_of: Some(PointsSelectorOneOf::Filter(qfilter)),
        };
        self.client
            .delete_points(collection, None, &selector, None)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(())
    }

    async fn list_collections(&self) -> PortResult<Vec<String>> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    async fn health(&self) -> PortResult<()> {
        self.client
            .health_check()
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(())
    }
}

fn point_id_to_uuid(id: Option<&PointId>) -> PortResult<Uuid> {
    match id.and_then(|p| p.point_id_options.as_ref()) {
        Some(PointIdOptions::Uuid(s)) => {
            Uuid::parse_str(s).map_err(|e| PortError::internal(e.to_string()))
        }
        Some(PointIdOptions::Num(n)) => Ok(Uuid::from_u128(*n as u128)),
        None => Err(PortError::internal("point returned without an id")),
    }
}

fn extract_dense_vector(vectors: qdrant_client::qdrant::Vectors) -> Vec<f32> {
    use qdrant_client::qdrant::vectors::VectorsOptions;
    match vectors.vectors_options {
        Some(VectorsOptions::Vector(v)) => v.data,
        _ => Vec::new(),
    }
}
