//! C4 Document Store Adapter + C5 Object Store Adapter (spec.md §4.4, §4.5),
//! plus the Postgres-backed process stores for §5's remaining persistence
//! singletons (profile, pending updates, monitor targets, search logs,
//! knowledge gaps, chat history).

pub mod chat_history_store;
pub mod object_store;
pub mod postgres_store;
pub mod process_store;

pub use chat_history_store::PgChatHistoryStore;
pub use object_store::LocalObjectStore;
pub use postgres_store::PgDocumentStore;
pub use process_store::{
    PgKnowledgeGapStore, PgMonitorTargetStore, PgPendingUpdateStore, PgProfileStore, PgSearchLogStore,
};
