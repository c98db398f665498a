use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::PortResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Backs C14 Conversation Context.
#[async_trait]
pub trait ChatHistoryPort: Send + Sync {
    async fn last_n(&self, session_id: &str, n: usize) -> PortResult<Vec<ChatMessage>>;

    async fn append(&self, session_id: &str, message: ChatMessage) -> PortResult<()>;
}
