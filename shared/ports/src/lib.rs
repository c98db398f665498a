//! Typed ports for every external collaborator named in §1 of the spec.
//!
//! Each port is a narrow `async_trait` the orchestrator and its services
//! depend on instead of a concrete SDK client, per the Design Note
//! "Duck-typed provider clients -> typed ports."

pub mod cache;
pub mod chat_history;
pub mod crawler;
pub mod document_store;
pub mod embedding;
pub mod llm;
pub mod object_store;
pub mod search;
pub mod store;
pub mod vector_index;

pub use cache::CachePort;
pub use chat_history::{ChatHistoryPort, ChatMessage, ChatRole};
pub use crawler::{CrawlResult, WebCrawlerPort};
pub use document_store::DocumentStorePort;
pub use embedding::EmbeddingModelPort;
pub use llm::{GenerationConfig, LlmMode, LlmPort, VisionAnalysis};
pub use object_store::ObjectStorePort;
pub use search::{WebSearchPort, WebSearchResult};
pub use store::{
    KnowledgeGapStorePort, MonitorTargetStorePort, PendingUpdateQuery, PendingUpdateStorePort,
    ProfileStorePort, SearchLogStorePort,
};
pub use vector_index::VectorIndexPort;

use conhub_models::error::ErrorKind;

/// Error returned by any port implementation. Every adapter maps its
/// underlying failure into one of the kinds in §7.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PortError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PortError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn dependency_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DependencyUnavailable, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

pub type PortResult<T> = Result<T, PortError>;
