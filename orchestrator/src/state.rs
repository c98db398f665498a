//! Composition root's shared handle (spec.md §9 "single composition root").
//! `main.rs` constructs every adapter exactly once and wires them into one
//! `AppState`; no runtime factory/registry layer sits behind it.

use std::sync::Arc;

use conhub_config::AppConfig;
use conhub_ports::document_store::DocumentStorePort;
use conhub_ports::object_store::ObjectStorePort;
use conhub_ports::store::{KnowledgeGapStorePort, PendingUpdateStorePort, ProfileStorePort};
use ingestion::{IngestionPipeline, MonitorScheduler};
use personalization::PersonalizationService;
use rag::{ConversationContext, RagEngine};
use searchlog::{GapDetector, SearchLogger};
use tools::ToolRegistry;

pub struct AppState {
    pub config: AppConfig,

    pub document_store: Arc<dyn DocumentStorePort>,
    pub object_store: Arc<dyn ObjectStorePort>,

    pub rag_engine: Arc<RagEngine>,
    pub conversation_context: Arc<ConversationContext>,
    pub intent_classifier: Arc<intent::IntentClassifier>,
    pub tool_registry: Arc<ToolRegistry>,

    pub personalization: Arc<PersonalizationService>,
    pub profile_store: Arc<dyn ProfileStorePort>,
    pub pending_update_store: Arc<dyn PendingUpdateStorePort>,
    pub knowledge_gap_store: Arc<dyn KnowledgeGapStorePort>,

    pub ingestion_pipeline: Arc<IngestionPipeline>,
    pub monitor_scheduler: Arc<MonitorScheduler>,

    pub search_logger: Arc<SearchLogger>,
    pub gap_detector: Arc<GapDetector>,
}
