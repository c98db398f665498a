//! C5 Object Store Adapter: local-filesystem implementation for
//! development. Presigned URLs are simulated with an HMAC-signed
//! expiring token rather than a real cloud SDK, since vendor SDK glue is
//! explicitly out of scope.

use std::path::PathBuf;

use async_trait::async_trait;
use conhub_ports::object_store::ObjectStorePort;
use conhub_ports::{PortError, PortResult};
use sha2::{Digest, Sha256};

pub struct LocalObjectStore {
    root: PathBuf,
    sign_secret: String,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, sign_secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { root: root.into(), sign_secret: sign_secret.into(), base_url: base_url.into() }
    }

    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        if key.contains("..") {
            return Err(PortError::invalid("object key must not contain '..'"));
        }
        Ok(self.root.join(key))
    }

    fn sign(&self, key: &str, expires_at: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sign_secret.as_bytes());
        hasher.update(b"|");
        hasher.update(key.as_bytes());
        hasher.update(b"|");
        hasher.update(expires_at.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verifies a presigned token produced by `presign`; used by the
    /// artifact-download handler to authorize direct reads.
    pub fn verify(&self, key: &str, expires_at: i64, token: &str, now: i64) -> bool {
        if now > expires_at {
            return false;
        }
        self.sign(key, expires_at) == token
    }
}

#[async_trait]
impl ObjectStorePort for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> PortResult<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::internal(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PortError::internal(e.to_string()))?;
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }

    async fn get(&self, key: &str) -> PortResult<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PortError::not_found(format!("object {key} not found"))
            } else {
                PortError::internal(e.to_string())
            }
        })
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::internal(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> PortResult<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn size(&self, key: &str) -> PortResult<u64> {
        let path = self.path_for(key)?;
        let meta = tokio::fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PortError::not_found(format!("object {key} not found"))
            } else {
                PortError::internal(e.to_string())
            }
        })?;
        Ok(meta.len())
    }

    async fn presign(&self, key: &str, ttl_seconds: u64) -> PortResult<String> {
        if !self.exists(key).await? {
            return Err(PortError::not_found(format!("object {key} not found")));
        }
        let expires_at = chrono::Utc::now().timestamp() + ttl_seconds as i64;
        let token = self.sign(key, expires_at);
        Ok(format!(
            "{}/{}?expires={}&token={}",
            self.base_url.trim_end_matches('/'),
            key,
            expires_at,
            token
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "secret", "http://localhost/objects");
        store.put("docs/a.txt", b"hello".to_vec(), "text/plain").await.unwrap();
        let bytes = store.get("docs/a.txt").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn presign_token_verifies_until_expiry() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "secret", "http://localhost/objects");
        store.put("docs/a.txt", b"hello".to_vec(), "text/plain").await.unwrap();
        let now = chrono::Utc::now().timestamp();
        let expires_at = now + 60;
        let token = store.sign("docs/a.txt", expires_at);
        assert!(store.verify("docs/a.txt", expires_at, &token, now));
        assert!(!store.verify("docs/a.txt", expires_at, &token, expires_at + 1));
    }

    #[tokio::test]
    async fn rejects_path_traversal_keys() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "secret", "http://localhost/objects");
        let err = store.get("../escape.txt").await.unwrap_err();
        assert_eq!(err.kind, conhub_models::error::ErrorKind::InvalidInput);
    }
}
