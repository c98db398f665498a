//! C2 Embedding Gateway + C3 Vector Index Adapter library surface, consumed
//! by the orchestrator composition root.

pub mod gateway;
pub mod vector_index;

pub use gateway::{EmbeddingGateway, EmbeddingProvider, NullEmbeddingProvider};
pub use vector_index::QdrantVectorIndex;
