//! C6 RAG Engine and C14 Conversation Context (spec.md §4.6, §4.14).

pub mod conversation;
pub mod engine;

pub use conversation::ConversationContext;
pub use engine::{IndexResult, RagContext, RagEngine, SearchConfig, SearchResultItem};
