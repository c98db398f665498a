//! C14 Conversation Context (spec.md §4.14): a bounded, best-effort window
//! over recent chat history. Absence of history must never fail the
//! request the context feeds into.

use std::sync::Arc;

use conhub_ports::chat_history::{ChatHistoryPort, ChatRole};
use tracing::warn;

/// Default number of prior turns pulled per request.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;
/// Character budget for the assembled context string.
const DEFAULT_CHAR_BUDGET: usize = 2000;
/// Older turns beyond this count are truncated rather than kept in full.
const RECENT_FULL_TURNS: usize = 4;
const TRUNCATED_TURN_CHARS: usize = 200;

pub struct ConversationContext {
    chat_history: Arc<dyn ChatHistoryPort>,
}

impl ConversationContext {
    pub fn new(chat_history: Arc<dyn ChatHistoryPort>) -> Self {
        Self { chat_history }
    }

    /// Fetches the last `window` messages for `session_id` and renders them
    /// into a bounded string. On any backend failure this returns an empty
    /// string instead of propagating the error — conversation context is
    /// additive, never a hard dependency (§4.14, §5).
    pub async fn build(&self, session_id: &str, window: usize) -> String {
        let messages = match self.chat_history.last_n(session_id, window).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(session_id, error = %e, "conversation context unavailable, continuing without it");
                return String::new();
            }
        };

        let turns: Vec<_> = messages.into_iter().filter(|m| m.role != ChatRole::System).collect();
        render(&turns)
    }
}

fn render(turns: &[conhub_ports::chat_history::ChatMessage]) -> String {
    let total = turns.len();
    let mut rendered = String::new();

    for (index, turn) in turns.iter().enumerate() {
        let is_recent = total - index <= RECENT_FULL_TURNS;
        let role = match turn.role {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
            ChatRole::System => continue,
        };

        let content = if is_recent || turn.content.len() <= TRUNCATED_TURN_CHARS {
            turn.content.clone()
        } else {
            format!("{}...", &turn.content[..TRUNCATED_TURN_CHARS])
        };

        let line = format!("{role}: {content}\n");
        if rendered.len() + line.len() > DEFAULT_CHAR_BUDGET {
            continue;
        }
        rendered.push_str(&line);
    }

    rendered.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use conhub_ports::chat_history::ChatMessage;
    use conhub_ports::PortResult;

    struct StubChatHistory {
        messages: Vec<ChatMessage>,
    }

    #[async_trait]
    impl ChatHistoryPort for StubChatHistory {
        async fn last_n(&self, _session_id: &str, n: usize) -> PortResult<Vec<ChatMessage>> {
            Ok(self.messages.iter().rev().take(n).rev().cloned().collect())
        }

        async fn append(&self, _session_id: &str, _message: ChatMessage) -> PortResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn drops_system_messages() {
        let store = Arc::new(StubChatHistory {
            messages: vec![
                ChatMessage { role: ChatRole::System, content: "you are a helper".into(), at: Utc::now() },
                ChatMessage { role: ChatRole::User, content: "xin chào".into(), at: Utc::now() },
            ],
        });
        let context = ConversationContext::new(store);
        let rendered = context.build("s1", 10).await;
        assert!(!rendered.contains("you are a helper"));
        assert!(rendered.contains("xin chào"));
    }

    #[tokio::test]
    async fn backend_failure_yields_empty_string() {
        struct FailingChatHistory;
        #[async_trait]
        impl ChatHistoryPort for FailingChatHistory {
            async fn last_n(&self, _session_id: &str, _n: usize) -> PortResult<Vec<ChatMessage>> {
                Err(conhub_ports::PortError::dependency_unavailable("db down"))
            }
            async fn append(&self, _session_id: &str, _message: ChatMessage) -> PortResult<()> {
                Ok(())
            }
        }
        let context = ConversationContext::new(Arc::new(FailingChatHistory));
        let rendered = context.build("s1", 10).await;
        assert_eq!(rendered, "");
    }
}
