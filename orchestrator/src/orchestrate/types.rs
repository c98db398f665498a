//! Request/response DTOs for the smart-query HTTP surface (spec.md §6).

use chrono::{DateTime, Utc};
use intent::IntentLabel;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_collection() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_top_k() -> usize {
    5
}

fn default_temperature() -> f32 {
    0.7
}

/// An image attached to a query, routing S4 Decide to `analyze_image`.
/// Not enumerated in spec.md §6's field list, but required for the
/// "image attached" row of the §4.9 policy table to ever fire over HTTP.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachedImageInput {
    pub data_base64: String,
    pub format: String,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmartQueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_info: Option<serde_json::Value>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_true")]
    pub enable_rag: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub similarity_threshold: f32,
    #[serde(default = "default_true")]
    pub include_sources: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub attached_image: Option<AttachedImageInput>,
}

impl SmartQueryRequest {
    /// `user_info` may carry `{"user_id": "..."}` or be a bare string id;
    /// tolerant extraction since the field is intentionally loosely typed.
    pub fn user_id(&self) -> Option<String> {
        match &self.user_info {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Object(map)) => map
                .get("user_id")
                .or_else(|| map.get("id"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if !(1..=20).contains(&self.top_k) {
            return Err("top_k must be between 1 and 20".to_string());
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err("similarity_threshold must be between 0 and 1".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0 and 2".to_string());
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 {
                return Err("max_tokens must be positive".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Document,
    WebSearch,
    DirectKnowledge,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDto {
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_text: Option<String>,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactDto {
    pub artifact_id: String,
    pub document_id: Uuid,
    pub file_name: String,
    pub artifact_type: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub size_bytes: u64,
    pub size_display: String,
    pub is_fillable: bool,
    pub fill_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ResponseMetadata {
    pub model_used: String,
    pub processing_time_ms: u64,
    pub tokens_used: u32,
    pub sources_count: usize,
    pub artifacts_count: usize,
    pub has_fillable_form: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmartQueryResponse {
    pub content: String,
    pub intent: IntentLabel,
    pub artifacts: Vec<ArtifactDto>,
    pub sources: Vec<SourceDto>,
    pub metadata: ResponseMetadata,
    pub created_at: DateTime<Utc>,
}

/// Renders a byte size the way the original form/file download UI expects
/// ("1.2 MB", "340 KB", "87 B").
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= MB {
        format!("{:.1} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.1} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_query() {
        let req = SmartQueryRequest {
            query: "   ".to_string(),
            session_id: None,
            user_info: None,
            collection: default_collection(),
            enable_rag: true,
            top_k: 5,
            similarity_threshold: 0.0,
            include_sources: true,
            temperature: 0.7,
            max_tokens: None,
            attached_image: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn formats_human_readable_sizes() {
        assert_eq!(format_size(87), "87 B");
        assert_eq!(format_size(340 * 1024), "340.0 KB");
    }
}
