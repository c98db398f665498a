use async_trait::async_trait;

use crate::PortResult;

/// C5 Object Store Adapter port.
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> PortResult<String>;

    async fn get(&self, key: &str) -> PortResult<Vec<u8>>;

    async fn delete(&self, key: &str) -> PortResult<()>;

    async fn exists(&self, key: &str) -> PortResult<bool>;

    async fn size(&self, key: &str) -> PortResult<u64>;

    /// All artifact downloads served to end users must go through this
    /// (§4.5).
    async fn presign(&self, key: &str, ttl_seconds: u64) -> PortResult<String>;
}
