//! C4 Document Store Adapter, following the `ChunkRepository` idiom
//! (`decision_engine/src/services/chunk_repository.rs`): `FromRow` structs,
//! `query_as` with bound parameters, no raw string interpolation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conhub_models::document::{Artifact, Document};
use conhub_ports::document_store::{DocumentQuery, DocumentStorePort};
use conhub_ports::{PortError, PortResult};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the adapter's own migration; callers needing a shared
    /// migration runner should use `sqlx::migrate!` against this schema
    /// instead.
    pub async fn ensure_schema(&self) -> PortResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                file_name TEXT,
                collection TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{}',
                tags TEXT[] NOT NULL DEFAULT '{}',
                created_by TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT true,
                content_hash TEXT NOT NULL,
                chunk_count BIGINT NOT NULL DEFAULT 0,
                vector_ids UUID[] NOT NULL DEFAULT '{}',
                artifacts JSONB NOT NULL DEFAULT '[]',
                primary_artifact_index BIGINT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        sqlx::query("CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents (collection)")
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        sqlx::query("CREATE INDEX IF NOT EXISTS documents_content_hash_idx ON documents (content_hash)")
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    title: String,
    file_name: Option<String>,
    collection: String,
    content: String,
    metadata: Value,
    tags: Vec<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_active: bool,
    content_hash: String,
    chunk_count: i64,
    vector_ids: Vec<Uuid>,
    artifacts: Value,
    primary_artifact_index: Option<i64>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = PortError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let artifacts: Vec<Artifact> =
            serde_json::from_value(row.artifacts).map_err(|e| PortError::internal(e.to_string()))?;
        let metadata: HashMap<String, Value> =
            serde_json::from_value(row.metadata).map_err(|e| PortError::internal(e.to_string()))?;
        Ok(Document {
            id: row.id,
            title: row.title,
            file_name: row.file_name,
            collection: row.collection,
            content: row.content,
            metadata,
            tags: row.tags.into_iter().collect(),
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_active: row.is_active,
            content_hash: row.content_hash,
            chunk_count: row.chunk_count as usize,
            vector_ids: row.vector_ids,
            artifacts,
            primary_artifact_index: row.primary_artifact_index.map(|i| i as usize),
        })
    }
}

#[async_trait]
impl DocumentStorePort for PgDocumentStore {
    async fn insert(&self, document: Document) -> PortResult<Document> {
        let metadata = serde_json::to_value(&document.metadata).map_err(|e| PortError::internal(e.to_string()))?;
        let artifacts = serde_json::to_value(&document.artifacts).map_err(|e| PortError::internal(e.to_string()))?;
        let tags: Vec<String> = document.tags.iter().cloned().collect();

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, title, file_name, collection, content, metadata, tags,
                created_by, created_at, updated_at, is_active, content_hash,
                chunk_count, vector_ids, artifacts, primary_artifact_index
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.file_name)
        .bind(&document.collection)
        .bind(&document.content)
        .bind(metadata)
        .bind(tags)
        .bind(&document.created_by)
        .bind(document.created_at)
        .bind(document.updated_at)
        .bind(document.is_active)
        .bind(&document.content_hash)
        .bind(document.chunk_count as i64)
        .bind(&document.vector_ids)
        .bind(artifacts)
        .bind(document.primary_artifact_index.map(|i| i as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        info!(document_id = %document.id, "inserted document");
        Ok(document)
    }

    async fn update(&self, document: Document) -> PortResult<Document> {
        let metadata = serde_json::to_value(&document.metadata).map_err(|e| PortError::internal(e.to_string()))?;
        let artifacts = serde_json::to_value(&document.artifacts).map_err(|e| PortError::internal(e.to_string()))?;
        let tags: Vec<String> = document.tags.iter().cloned().collect();

        let result = sqlx::query(
            r#"
            UPDATE documents SET
                title = $2, file_name = $3, collection = $4, content = $5,
                metadata = $6, tags = $7, updated_at = $8, is_active = $9,
                content_hash = $10, chunk_count = $11, vector_ids = $12,
                artifacts = $13, primary_artifact_index = $14
            WHERE id = $1
            "#,
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.file_name)
        .bind(&document.collection)
        .bind(&document.content)
        .bind(metadata)
        .bind(tags)
        .bind(document.updated_at)
        .bind(document.is_active)
        .bind(&document.content_hash)
        .bind(document.chunk_count as i64)
        .bind(&document.vector_ids)
        .bind(artifacts)
        .bind(document.primary_artifact_index.map(|i| i as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found(format!("document {} not found", document.id)));
        }
        Ok(document)
    }

    async fn get_by_id(&self, id: Uuid) -> PortResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        row.map(Document::try_from).transpose()
    }

    async fn exists(&self, id: Uuid) -> PortResult<bool> {
        let row: Option<(bool,)> = sqlx::query_as("SELECT true FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn find_by_content_hash(&self, content_hash: &str) -> PortResult<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT * FROM documents WHERE content_hash = $1 AND is_active = true",
        )
        .bind(content_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn list(&self, query: DocumentQuery) -> PortResult<Vec<Document>> {
        // Metadata equality is applied in-process after a collection-scoped
        // fetch, matching the exact-match-conjunction contract of §4.4
        // without hand-building dynamic JSONB predicates per key.
        let rows: Vec<DocumentRow> = sqlx::query_as(
            r#"
            SELECT * FROM documents
            WHERE ($1::text IS NULL OR collection = $1)
              AND ($2 = false OR is_active = true)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&query.collection)
        .bind(query.only_active)
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let document = Document::try_from(row)?;
            if query
                .metadata_equals
                .iter()
                .all(|(k, v)| document.metadata.get(k) == Some(v))
            {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    async fn count(&self, query: DocumentQuery) -> PortResult<u64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM documents WHERE ($1::text IS NULL OR collection = $1) AND ($2 = false OR is_active = true)",
        )
        .bind(&query.collection)
        .bind(query.only_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;
        Ok(row.0 as u64)
    }

    /// Deletes the document row. The caller is responsible for also
    /// deleting vectors and artifacts (§4.4 cascading-delete contract).
    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            warn!(document_id = %id, "delete requested for missing document");
            return Err(PortError::not_found(format!("document {id} not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Postgres-backed tests require a live database; covered by the
    // orchestrator crate's integration suite against a test container.
}
