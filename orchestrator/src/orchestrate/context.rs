//! S1 Context (spec.md §4.9): pulls the last N turns for `session_id`
//! through C14, bounded and best-effort.

use rag::ConversationContext;

const DEFAULT_HISTORY_TURNS: usize = 6;

pub async fn build_context(conversation_context: &ConversationContext, session_id: Option<&str>) -> String {
    match session_id {
        Some(session_id) => conversation_context.build(session_id, DEFAULT_HISTORY_TURNS).await,
        None => String::new(),
    }
}
