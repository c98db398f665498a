use async_trait::async_trait;

use crate::PortResult;

/// Generic key-value cache port backing the embedding cache and query cache.
/// Implementations must degrade gracefully: a cache outage never fails the
/// caller (§5).
#[async_trait]
pub trait CachePort: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> PortResult<()>;

    async fn delete_prefix(&self, prefix: &str) -> PortResult<()>;

    async fn health(&self) -> bool;
}
