//! C12 Ingestion Pipeline (spec.md §4.12): dedup against the pending queue
//! and the document store, else resolve via C11 and persist a Pending
//! Update. Grounded on `document_ingest_service.py`'s `ingest`.

use std::collections::HashMap;
use std::sync::Arc;

use conhub_models::document::content_hash;
use conhub_models::ingestion::{DetectionType, PendingStatus, PendingUpdate};
use conhub_ports::document_store::{DocumentQuery, DocumentStorePort};
use conhub_ports::store::PendingUpdateStorePort;
use conhub_ports::PortResult;
use tracing::info;

use crate::resolver::DocumentResolver;

#[derive(Debug, Clone)]
pub struct IngestPayload {
    pub source_id: String,
    pub title: String,
    pub content: String,
    pub source_url: String,
    pub collection: String,
    pub category: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub priority: u8,
}

pub struct IngestionPipeline {
    pending_store: Arc<dyn PendingUpdateStorePort>,
    document_store: Arc<dyn DocumentStorePort>,
    resolver: Arc<DocumentResolver>,
}

impl IngestionPipeline {
    pub fn new(
        pending_store: Arc<dyn PendingUpdateStorePort>,
        document_store: Arc<dyn DocumentStorePort>,
        resolver: Arc<DocumentResolver>,
    ) -> Self {
        Self { pending_store, document_store, resolver }
    }

    pub async fn ingest(&self, payload: IngestPayload) -> PortResult<PendingUpdate> {
        let hash = content_hash(&payload.content);

        let pending_duplicates = self.pending_store.find_by_content_hash(&hash).await?;
        if !pending_duplicates.is_empty() {
            return self.persist_duplicate(&payload, &hash, "duplicate in pending queue", None).await;
        }

        let existing_docs = self
            .document_store
            .list(DocumentQuery {
                collection: Some(payload.collection.clone()),
                metadata_equals: vec![("content_hash".to_string(), serde_json::json!(hash))],
                only_active: true,
                limit: 1,
                offset: 0,
            })
            .await?;
        if let Some(doc) = existing_docs.first() {
            return self
                .persist_duplicate(&payload, &hash, "duplicate existing document content hash", Some(doc.id))
                .await;
        }

        let resolution = self
            .resolver
            .resolve(&payload.title, &payload.content, &payload.collection, &payload.source_url, None)
            .await?;

        let detection_type = match resolution.action {
            DetectionType::Update => DetectionType::Update,
            DetectionType::Unrelated => DetectionType::Unrelated,
            _ => DetectionType::New,
        };
        let status =
            if detection_type == DetectionType::Unrelated { PendingStatus::Rejected } else { PendingStatus::Pending };

        let mut metadata = payload.metadata.clone();
        metadata.entry("collection".to_string()).or_insert_with(|| serde_json::json!(payload.collection));
        metadata.entry("source_url".to_string()).or_insert_with(|| serde_json::json!(payload.source_url));
        metadata.entry("summary".to_string()).or_insert_with(|| serde_json::json!(resolution.summary));

        let similarity_score = resolution.candidates.first().map(|c| c.score).unwrap_or(0.0);

        let mut pending = PendingUpdate::new(
            payload.source_id.clone(),
            payload.title.clone(),
            payload.content.clone(),
            hash,
            detection_type,
            similarity_score,
            resolution.updated_id,
        );
        pending.source_url = Some(payload.source_url.clone());
        pending.category = payload.category.clone();
        pending.candidate_doc_ids = resolution.candidates.iter().filter_map(|c| c.id).collect();
        pending.llm_summary = Some(resolution.summary.clone());
        pending.llm_reason = resolution.reason.clone();
        pending.status = status;
        pending.priority = payload.priority;
        pending.metadata = metadata;

        self.pending_store.insert(pending).await
    }

    async fn persist_duplicate(
        &self,
        payload: &IngestPayload,
        hash: &str,
        reason: &str,
        matched_doc_id: Option<uuid::Uuid>,
    ) -> PortResult<PendingUpdate> {
        info!(source_url = %payload.source_url, reason, "duplicate content detected during ingestion");

        let mut pending = PendingUpdate::new(
            payload.source_id.clone(),
            payload.title.clone(),
            payload.content.clone(),
            hash.to_string(),
            DetectionType::Duplicate,
            1.0,
            matched_doc_id,
        );
        pending.source_url = Some(payload.source_url.clone());
        pending.category = payload.category.clone();
        pending.llm_summary = Some(truncate_chars(&payload.content, 200));
        pending.llm_reason = Some(reason.to_string());
        pending.metadata = payload.metadata.clone();
        pending.priority = payload.priority;

        self.pending_store.insert(pending).await
    }
}

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use conhub_models::chunk::{VectorRecord, VectorRecordPayload};
    use conhub_models::document::Document;
    use conhub_ports::embedding::EmbeddingModelPort;
    use conhub_ports::llm::{GenerationConfig, LlmMode, LlmPort, VisionAnalysis};
    use conhub_ports::store::PendingUpdateQuery;
    use conhub_ports::vector_index::{MetadataFilter, PayloadPatch, ScoredRecord, VectorIndexPort};
    use conhub_ports::PortResult;
    use uuid::Uuid;

    struct FakeEmbedding;
    #[async_trait]
    impl EmbeddingModelPort for FakeEmbedding {
        fn dimension(&self) -> usize {
            4
        }
        async fn embed(&self, _text: &str) -> PortResult<Vec<f32>> {
            Ok(vec![0.1, 0.1, 0.1, 0.1])
        }
        async fn embed_batch(&self, texts: &[String]) -> PortResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.1, 0.1, 0.1]).collect())
        }
    }

    struct FakeVectorIndex {
        candidates: Vec<ScoredRecord>,
    }
    #[async_trait]
    impl VectorIndexPort for FakeVectorIndex {
        async fn ensure_collection(&self, _collection: &str, _dim: usize) -> PortResult<()> {
            Ok(())
        }
        async fn upsert(&self, _collection: &str, _records: Vec<VectorRecord>) -> PortResult<()> {
            Ok(())
        }
        async fn search(
            &self,
            _collection: &str,
            _query_vector: &[f32],
            top_k: usize,
            _score_threshold: f32,
            _metadata_filter: Option<&MetadataFilter>,
        ) -> PortResult<Vec<ScoredRecord>> {
            Ok(self.candidates.iter().take(top_k).cloned().collect())
        }
        async fn scroll(
            &self,
            _collection: &str,
            _cursor: Option<String>,
            _limit: usize,
            _metadata_filter: Option<&MetadataFilter>,
        ) -> PortResult<(Vec<VectorRecord>, Option<String>)> {
            Ok((Vec::new(), None))
        }
        async fn get(&self, _collection: &str, _id: Uuid) -> PortResult<Option<VectorRecord>> {
            Ok(None)
        }
        async fn update_payload(&self, _collection: &str, _id: Uuid, _patch: PayloadPatch) -> PortResult<()> {
            Ok(())
        }
        async fn delete_ids(&self, _collection: &str, _ids: &[Uuid]) -> PortResult<()> {
            Ok(())
        }
        async fn delete_by_filter(&self, _collection: &str, _filter: MetadataFilter) -> PortResult<()> {
            Ok(())
        }
        async fn list_collections(&self) -> PortResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn health(&self) -> PortResult<()> {
            Ok(())
        }
    }

    /// Always answers `generate` with a fixed update classification JSON,
    /// so `resolve()` deterministically returns `DetectionType::Update`.
    struct FakeLlmClassifiesAsUpdate {
        updated_id: Uuid,
    }
    #[async_trait]
    impl LlmPort for FakeLlmClassifiesAsUpdate {
        async fn generate(&self, mode: LlmMode, _prompt: &str, _config: &GenerationConfig) -> PortResult<String> {
            match mode {
                LlmMode::Qa => Ok("tóm tắt ngắn gọn".to_string()),
                LlmMode::Reasoning => Ok(format!(
                    "{{\"action\":2,\"reason\":\"cập nhật nội dung cũ\",\"updated_id\":\"{}\"}}",
                    self.updated_id
                )),
            }
        }
        async fn analyze_image(&self, _image_bytes: &[u8], _image_format: &str, _question: Option<&str>) -> PortResult<VisionAnalysis> {
            unreachable!("not exercised by ingestion tests")
        }
    }

    struct FakePendingStore {
        inserted: Mutex<Vec<PendingUpdate>>,
    }
    impl FakePendingStore {
        fn new() -> Self {
            Self { inserted: Mutex::new(Vec::new()) }
        }
    }
    #[async_trait]
    impl PendingUpdateStorePort for FakePendingStore {
        async fn insert(&self, update: PendingUpdate) -> PortResult<PendingUpdate> {
            self.inserted.lock().unwrap().push(update.clone());
            Ok(update)
        }
        async fn find_by_content_hash(&self, content_hash: &str) -> PortResult<Vec<PendingUpdate>> {
            Ok(self.inserted.lock().unwrap().iter().filter(|p| p.content_hash == content_hash).cloned().collect())
        }
        async fn list(&self, _query: PendingUpdateQuery) -> PortResult<Vec<PendingUpdate>> {
            Ok(self.inserted.lock().unwrap().clone())
        }
        async fn get_by_id(&self, id: Uuid) -> PortResult<Option<PendingUpdate>> {
            Ok(self.inserted.lock().unwrap().iter().find(|p| p.id == id).cloned())
        }
        async fn update_status(&self, id: Uuid, status: PendingStatus) -> PortResult<()> {
            if let Some(p) = self.inserted.lock().unwrap().iter_mut().find(|p| p.id == id) {
                p.status = status;
            }
            Ok(())
        }
    }

    /// Documents keyed by content hash, mirroring `find_by_content_hash`
    /// plus the `metadata_equals` lookup `ingest()` performs via `list`.
    struct FakeDocumentStore {
        documents: Vec<Document>,
    }
    #[async_trait]
    impl DocumentStorePort for FakeDocumentStore {
        async fn insert(&self, document: Document) -> PortResult<Document> {
            Ok(document)
        }
        async fn update(&self, document: Document) -> PortResult<Document> {
            Ok(document)
        }
        async fn get_by_id(&self, id: Uuid) -> PortResult<Option<Document>> {
            Ok(self.documents.iter().find(|d| d.id == id).cloned())
        }
        async fn exists(&self, id: Uuid) -> PortResult<bool> {
            Ok(self.documents.iter().any(|d| d.id == id))
        }
        async fn find_by_content_hash(&self, content_hash: &str) -> PortResult<Vec<Document>> {
            Ok(self.documents.iter().filter(|d| d.content_hash == content_hash).cloned().collect())
        }
        async fn list(&self, query: DocumentQuery) -> PortResult<Vec<Document>> {
            let wanted_hash = query.metadata_equals.iter().find(|(k, _)| k == "content_hash").and_then(|(_, v)| v.as_str());
            Ok(match wanted_hash {
                Some(hash) => self.documents.iter().filter(|d| d.content_hash == hash).cloned().collect(),
                None => self.documents.clone(),
            })
        }
        async fn count(&self, _query: DocumentQuery) -> PortResult<u64> {
            Ok(self.documents.len() as u64)
        }
        async fn delete(&self, _id: Uuid) -> PortResult<()> {
            Ok(())
        }
    }

    fn payload(content: &str) -> IngestPayload {
        IngestPayload {
            source_id: "src-1".to_string(),
            title: "Thông báo nghỉ học".to_string(),
            content: content.to_string(),
            source_url: "https://example.edu/notice".to_string(),
            collection: "default".to_string(),
            category: None,
            metadata: StdHashMap::new(),
            priority: 5,
        }
    }

    /// Scenario 4 (spec.md §8): ingesting a near-duplicate notice whose
    /// nearest indexed neighbor scores >=0.85 produces a Pending Update
    /// with `detection_type=update`, `matched_doc_id` set to the matched
    /// document, and `status=pending`.
    #[tokio::test]
    async fn near_duplicate_notice_is_detected_as_update() {
        let existing_doc_id = Uuid::new_v4();
        let candidate = ScoredRecord {
            record: VectorRecord {
                id: Uuid::new_v4(),
                embedding: vec![0.1, 0.1, 0.1, 0.1],
                payload: VectorRecordPayload {
                    content: "nội dung thông báo nghỉ học cũ".to_string(),
                    source_id: existing_doc_id,
                    chunk_index: 0,
                    collection: "default".to_string(),
                    metadata: StdHashMap::new(),
                },
            },
            score: 0.9,
        };

        let pending_store = Arc::new(FakePendingStore::new());
        let document_store: Arc<dyn DocumentStorePort> = Arc::new(FakeDocumentStore { documents: Vec::new() });
        let resolver = Arc::new(DocumentResolver::new(
            Arc::new(FakeEmbedding),
            Arc::new(FakeVectorIndex { candidates: vec![candidate] }),
            Arc::new(FakeLlmClassifiesAsUpdate { updated_id: existing_doc_id }),
        ));
        let pipeline = IngestionPipeline::new(pending_store, document_store, resolver);

        let pending = pipeline.ingest(payload("nội dung thông báo nghỉ học mới, gần giống bản cũ")).await.unwrap();

        assert_eq!(pending.detection_type, DetectionType::Update);
        assert_eq!(pending.matched_doc_id, Some(existing_doc_id));
        assert_eq!(pending.status, PendingStatus::Pending);
        assert!(pending.similarity_score >= 0.85);
    }

    /// Scenario 5 (spec.md §8): ingesting byte-identical content to an
    /// already-indexed document is detected purely from the content hash
    /// match, producing `detection_type=duplicate`, `status=rejected`,
    /// with no new `Document` created (the resolver/LLM is never consulted).
    #[tokio::test]
    async fn exact_duplicate_content_is_rejected_without_calling_resolver() {
        let content = "nội dung thông báo giống hệt bản gốc";
        let mut existing = Document::new("Thông báo gốc", "default", content, content_hash(content), None);
        existing.id = Uuid::new_v4();

        let pending_store = Arc::new(FakePendingStore::new());
        let document_store: Arc<dyn DocumentStorePort> = Arc::new(FakeDocumentStore { documents: vec![existing.clone()] });
        // A resolver whose LLM/vector backends panic if ever invoked: the
        // content-hash short-circuit must return before `resolve()` runs.
        let resolver = Arc::new(DocumentResolver::new(
            Arc::new(PanicEmbedding),
            Arc::new(PanicVectorIndex),
            Arc::new(PanicLlm),
        ));
        let pipeline = IngestionPipeline::new(pending_store, document_store, resolver);

        let pending = pipeline.ingest(payload(content)).await.unwrap();

        assert_eq!(pending.detection_type, DetectionType::Duplicate);
        assert_eq!(pending.status, PendingStatus::Rejected);
        assert_eq!(pending.matched_doc_id, Some(existing.id));
    }

    struct PanicEmbedding;
    #[async_trait]
    impl EmbeddingModelPort for PanicEmbedding {
        fn dimension(&self) -> usize {
            4
        }
        async fn embed(&self, _text: &str) -> PortResult<Vec<f32>> {
            panic!("resolver should not run for an exact content-hash duplicate")
        }
        async fn embed_batch(&self, _texts: &[String]) -> PortResult<Vec<Vec<f32>>> {
            panic!("resolver should not run for an exact content-hash duplicate")
        }
    }

    struct PanicVectorIndex;
    #[async_trait]
    impl VectorIndexPort for PanicVectorIndex {
        async fn ensure_collection(&self, _collection: &str, _dim: usize) -> PortResult<()> {
            Ok(())
        }
        async fn upsert(&self, _collection: &str, _records: Vec<VectorRecord>) -> PortResult<()> {
            Ok(())
        }
        async fn search(
            &self,
            _collection: &str,
            _query_vector: &[f32],
            _top_k: usize,
            _score_threshold: f32,
            _metadata_filter: Option<&MetadataFilter>,
        ) -> PortResult<Vec<ScoredRecord>> {
            panic!("resolver should not run for an exact content-hash duplicate")
        }
        async fn scroll(
            &self,
            _collection: &str,
            _cursor: Option<String>,
            _limit: usize,
            _metadata_filter: Option<&MetadataFilter>,
        ) -> PortResult<(Vec<VectorRecord>, Option<String>)> {
            Ok((Vec::new(), None))
        }
        async fn get(&self, _collection: &str, _id: Uuid) -> PortResult<Option<VectorRecord>> {
            Ok(None)
        }
        async fn update_payload(&self, _collection: &str, _id: Uuid, _patch: PayloadPatch) -> PortResult<()> {
            Ok(())
        }
        async fn delete_ids(&self, _collection: &str, _ids: &[Uuid]) -> PortResult<()> {
            Ok(())
        }
        async fn delete_by_filter(&self, _collection: &str, _filter: MetadataFilter) -> PortResult<()> {
            Ok(())
        }
        async fn list_collections(&self) -> PortResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn health(&self) -> PortResult<()> {
            Ok(())
        }
    }

    struct PanicLlm;
    #[async_trait]
    impl LlmPort for PanicLlm {
        async fn generate(&self, _mode: LlmMode, _prompt: &str, _config: &GenerationConfig) -> PortResult<String> {
            panic!("resolver should not run for an exact content-hash duplicate")
        }
        async fn analyze_image(&self, _image_bytes: &[u8], _image_format: &str, _question: Option<&str>) -> PortResult<VisionAnalysis> {
            panic!("resolver should not run for an exact content-hash duplicate")
        }
    }
}
