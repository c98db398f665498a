//! `CachePort` default adapter over Redis, grounded on
//! `database/src/cache.rs`'s `ConnectionManager`-wrapped `RedisCache`. A
//! cache outage degrades to a miss/no-op rather than failing the caller
//! (§5), since `ConnectionManager` auto-reconnects but individual
//! commands can still fail mid-outage.

use async_trait::async_trait;
use conhub_ports::cache::CachePort;
use conhub_ports::{PortError, PortResult};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> PortResult<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CachePort for RedisCache {
    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(error = %err, key, "cache get failed, treating as miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> PortResult<()> {
        let mut conn = self.manager.clone();
        if let Err(err) = conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await {
            warn!(error = %err, key, "cache set failed, continuing without caching");
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> PortResult<()> {
        let mut conn = self.manager.clone();
        let pattern = format!("{prefix}*");
        let keys: Vec<String> = match conn.keys(&pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, prefix, "cache key scan failed, skipping delete");
                return Ok(());
            }
        };
        if keys.is_empty() {
            return Ok(());
        }
        if let Err(err) = conn.del::<_, ()>(keys).await {
            warn!(error = %err, prefix, "cache prefix delete failed");
        }
        Ok(())
    }

    async fn health(&self) -> bool {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await.is_ok()
    }
}
