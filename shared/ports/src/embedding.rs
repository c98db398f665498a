use async_trait::async_trait;

use crate::PortResult;

/// C2 Embedding Gateway port.
#[async_trait]
pub trait EmbeddingModelPort: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> PortResult<Vec<f32>>;

    /// Preserves index order, including for empty inputs (§4.2).
    async fn embed_batch(&self, texts: &[String]) -> PortResult<Vec<Vec<f32>>>;
}
