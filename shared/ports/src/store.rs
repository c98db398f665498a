//! Persistence ports for the remaining process-wide singletons named in §5:
//! profile store, pending-update queue, monitor targets, search logs and
//! knowledge gaps. Same `FromRow`-backed-adapter idiom as
//! `document_store.rs`, split out because each backs a distinct collection.

use async_trait::async_trait;
use uuid::Uuid;

use conhub_models::ingestion::{MonitorTarget, PendingUpdate};
use conhub_models::profile::StudentProfile;
use conhub_models::search_log::{KnowledgeGap, SearchLog};

use crate::PortResult;

/// Backs C10 Personalization Service. Implementations must serialize
/// concurrent updates per user_id (§5) — either a per-user lock or a
/// compare-and-set write.
#[async_trait]
pub trait ProfileStorePort: Send + Sync {
    async fn get(&self, user_id: &str) -> PortResult<Option<StudentProfile>>;

    async fn put(&self, profile: StudentProfile) -> PortResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct PendingUpdateQuery {
    pub status: Option<conhub_models::ingestion::PendingStatus>,
    pub limit: usize,
    pub offset: usize,
}

/// Backs C12 Ingestion Pipeline. Inserts may run concurrently; approving an
/// entry takes a per-entry lock (§5).
#[async_trait]
pub trait PendingUpdateStorePort: Send + Sync {
    async fn insert(&self, update: PendingUpdate) -> PortResult<PendingUpdate>;

    async fn find_by_content_hash(&self, content_hash: &str) -> PortResult<Vec<PendingUpdate>>;

    async fn list(&self, query: PendingUpdateQuery) -> PortResult<Vec<PendingUpdate>>;

    async fn get_by_id(&self, id: Uuid) -> PortResult<Option<PendingUpdate>>;

    async fn update_status(&self, id: Uuid, status: conhub_models::ingestion::PendingStatus) -> PortResult<()>;
}

/// Backs C13 Monitor Scheduler. Updates to `last_checked_at` use per-target
/// compare-and-set (§5).
#[async_trait]
pub trait MonitorTargetStorePort: Send + Sync {
    async fn list_active(&self) -> PortResult<Vec<MonitorTarget>>;

    async fn get(&self, id: Uuid) -> PortResult<Option<MonitorTarget>>;

    async fn save(&self, target: MonitorTarget) -> PortResult<()>;
}

/// Backs C15 Search Logger & Gap Detector.
#[async_trait]
pub trait SearchLogStorePort: Send + Sync {
    async fn insert(&self, log: SearchLog) -> PortResult<()>;

    /// Search logs within the last `window_days`, for gap aggregation.
    async fn recent(&self, window_days: i64) -> PortResult<Vec<SearchLog>>;
}

#[async_trait]
pub trait KnowledgeGapStorePort: Send + Sync {
    async fn find_by_topic(&self, topic: &str) -> PortResult<Option<KnowledgeGap>>;

    async fn upsert(&self, gap: KnowledgeGap) -> PortResult<()>;
}
