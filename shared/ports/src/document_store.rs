use async_trait::async_trait;
use uuid::Uuid;

use conhub_models::document::Document;

use crate::PortResult;

#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub collection: Option<String>,
    pub metadata_equals: Vec<(String, serde_json::Value)>,
    pub only_active: bool,
    pub limit: usize,
    pub offset: usize,
}

/// C4 Document Store Adapter port.
#[async_trait]
pub trait DocumentStorePort: Send + Sync {
    async fn insert(&self, document: Document) -> PortResult<Document>;

    async fn update(&self, document: Document) -> PortResult<Document>;

    async fn get_by_id(&self, id: Uuid) -> PortResult<Option<Document>>;

    async fn exists(&self, id: Uuid) -> PortResult<bool>;

    async fn find_by_content_hash(&self, content_hash: &str) -> PortResult<Vec<Document>>;

    async fn list(&self, query: DocumentQuery) -> PortResult<Vec<Document>>;

    async fn count(&self, query: DocumentQuery) -> PortResult<u64>;

    /// Caller is responsible for also deleting vectors and artifacts (§4.4).
    async fn delete(&self, id: Uuid) -> PortResult<()>;
}
