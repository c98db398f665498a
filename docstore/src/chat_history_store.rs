//! Postgres adapter for C14 Conversation Context's backing store
//! (`ChatHistoryPort`). Same `FromRow`-backed idiom as `process_store.rs`;
//! split into its own module since it backs an append-only log rather than
//! a single-row-per-key table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use conhub_ports::chat_history::{ChatHistoryPort, ChatMessage, ChatRole};
use conhub_ports::{PortError, PortResult};

fn to_dep_unavailable(e: sqlx::Error) -> PortError {
    PortError::dependency_unavailable(e.to_string())
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::System => "system",
    }
}

fn parse_role(raw: &str) -> ChatRole {
    match raw {
        "assistant" => ChatRole::Assistant,
        "system" => ChatRole::System,
        _ => ChatRole::User,
    }
}

#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    #[allow(dead_code)]
    id: Uuid,
    #[allow(dead_code)]
    session_id: String,
    role: String,
    content: String,
    at: DateTime<Utc>,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        ChatMessage { role: parse_role(&row.role), content: row.content, at: row.at }
    }
}

pub struct PgChatHistoryStore {
    pool: PgPool,
}

impl PgChatHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> PortResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id UUID PRIMARY KEY,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS chat_messages_session_at_idx ON chat_messages (session_id, at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl ChatHistoryPort for PgChatHistoryStore {
    /// Returns the last `n` messages for `session_id` in chronological
    /// order (oldest first), matching the order `ConversationContext`
    /// expects to render in.
    async fn last_n(&self, session_id: &str, n: usize) -> PortResult<Vec<ChatMessage>> {
        let rows: Vec<ChatMessageRow> = sqlx::query_as(
            "SELECT id, session_id, role, content, at FROM chat_messages
             WHERE session_id = $1 ORDER BY at DESC LIMIT $2",
        )
        .bind(session_id)
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;

        Ok(rows.into_iter().rev().map(ChatMessage::from).collect())
    }

    async fn append(&self, session_id: &str, message: ChatMessage) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, role, content, at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(role_str(message.role))
        .bind(&message.content)
        .bind(message.at)
        .execute(&self.pool)
        .await
        .map_err(to_dep_unavailable)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Postgres-backed tests require a live database; covered by the
    // orchestrator crate's integration suite against a test container.
}
