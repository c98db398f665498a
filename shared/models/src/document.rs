//! Document and Artifact records (§3 Data Model).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Document,
    Spreadsheet,
    Presentation,
    Image,
    Form,
    Template,
    Other,
}

/// A downloadable file attached to a Document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub storage_key: String,
    pub artifact_type: ArtifactType,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub preview_key: Option<String>,
    pub is_fillable: bool,
    pub fill_fields: Vec<String>,
}

impl Artifact {
    pub fn new(
        storage_key: impl Into<String>,
        artifact_type: ArtifactType,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            storage_key: storage_key.into(),
            artifact_type,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            preview_key: None,
            is_fillable: false,
            fill_fields: Vec::new(),
        }
    }

    /// Marks the artifact fillable; a fillable artifact must carry at least
    /// one placeholder name.
    pub fn with_fill_fields(mut self, fields: Vec<String>) -> Result<Self, ModelError> {
        if fields.is_empty() {
            return Err(ModelError::invalid(
                "a fillable artifact requires at least one fill field",
            ));
        }
        self.is_fillable = true;
        self.fill_fields = fields;
        Ok(self)
    }

    const PREVIEWABLE_EXTENSIONS: &'static [&'static str] =
        &["pdf", "png", "jpg", "jpeg", "gif", "webp"];

    pub fn is_previewable(&self) -> bool {
        self.file_name
            .rsplit('.')
            .next()
            .map(|ext| Self::PREVIEWABLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub file_name: Option<String>,
    pub collection: String,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub tags: HashSet<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub content_hash: String,
    pub chunk_count: usize,
    /// Ordered, parallel to the chunk sequence.
    pub vector_ids: Vec<Uuid>,
    pub artifacts: Vec<Artifact>,
    /// -1 (encoded as `None` here) or a valid index into `artifacts`.
    pub primary_artifact_index: Option<usize>,
}

impl Document {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: impl Into<String>,
        collection: impl Into<String>,
        content: impl Into<String>,
        content_hash: impl Into<String>,
        created_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            file_name: None,
            collection: collection.into(),
            content: content.into(),
            metadata: HashMap::new(),
            tags: HashSet::new(),
            created_by,
            created_at: now,
            updated_at: now,
            is_active: true,
            content_hash: content_hash.into(),
            chunk_count: 0,
            vector_ids: Vec::new(),
            artifacts: Vec::new(),
            primary_artifact_index: None,
        }
    }

    /// Attaches the result of indexing: `vector_ids.len()` must equal
    /// `chunk_count`, per the invariant in §3.
    pub fn set_indexed(&mut self, vector_ids: Vec<Uuid>, chunk_count: usize) -> Result<(), ModelError> {
        if vector_ids.len() != chunk_count {
            return Err(ModelError::internal(format!(
                "vector_ids length {} does not match chunk_count {}",
                vector_ids.len(),
                chunk_count
            )));
        }
        self.vector_ids = vector_ids;
        self.chunk_count = chunk_count;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_primary_artifact(&mut self, index: Option<usize>) -> Result<(), ModelError> {
        if let Some(i) = index {
            if i >= self.artifacts.len() {
                return Err(ModelError::invalid("primary_artifact_index out of range"));
            }
        }
        self.primary_artifact_index = index;
        Ok(())
    }

    pub fn has_artifacts(&self) -> bool {
        !self.artifacts.is_empty()
    }

    pub fn archive(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

/// SHA-256 over whitespace-normalized content, used for dedup everywhere a
/// content hash is needed (§3, §4.12).
pub fn content_hash(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let normalized = normalize_content(content);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Collapses runs of whitespace to a single space and strips leading/trailing
/// space on each line, matching spec.md §4.12's `normalize`.
pub fn normalize_content(content: &str) -> String {
    content
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic_and_whitespace_insensitive() {
        let a = content_hash("Hello   world\n\n");
        let b = content_hash("Hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn set_indexed_rejects_mismatched_lengths() {
        let mut doc = Document::new("t", "c", "body", "hash", None);
        let err = doc.set_indexed(vec![Uuid::new_v4()], 2).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Internal);
    }

    #[test]
    fn fillable_artifact_requires_fields() {
        let artifact = Artifact::new("k", ArtifactType::Form, "f.docx", "application/msword", 10);
        assert!(artifact.with_fill_fields(vec![]).is_err());
    }
}
