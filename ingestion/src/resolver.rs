//! C11 Document Resolver (spec.md §4.11): summarize, search for similar
//! documents, triage new/update/unrelated via LLM. Grounded on
//! `original_source/.../document_resolver.py`'s `resolve`/`_summarize`/
//! `_search_similar`/`_classify`.

use std::sync::Arc;

use conhub_models::ingestion::DetectionType;
use conhub_ports::embedding::EmbeddingModelPort;
use conhub_ports::llm::{GenerationConfig, LlmMode, LlmPort};
use conhub_ports::vector_index::VectorIndexPort;
use conhub_ports::PortResult;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

const SUMMARY_SOURCE_CHARS: usize = 4000;
const SUMMARY_FALLBACK_CHARS: usize = 500;
const CANDIDATE_SUMMARY_CHARS: usize = 400;
const DEFAULT_MAX_CANDIDATES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub summary: String,
    pub score: f32,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub action: DetectionType,
    pub reason: Option<String>,
    pub updated_id: Option<Uuid>,
    pub summary: String,
    pub candidates: Vec<CandidateDocument>,
}

pub struct DocumentResolver {
    embedding: Arc<dyn EmbeddingModelPort>,
    vector_index: Arc<dyn VectorIndexPort>,
    llm: Arc<dyn LlmPort>,
}

impl DocumentResolver {
    pub fn new(
        embedding: Arc<dyn EmbeddingModelPort>,
        vector_index: Arc<dyn VectorIndexPort>,
        llm: Arc<dyn LlmPort>,
    ) -> Self {
        Self { embedding, vector_index, llm }
    }

    pub async fn resolve(
        &self,
        title: &str,
        content: &str,
        collection: &str,
        source_url: &str,
        max_candidates: Option<usize>,
    ) -> PortResult<ResolutionResult> {
        let max_candidates = max_candidates.unwrap_or(DEFAULT_MAX_CANDIDATES);
        let summary = self.summarize(content).await;
        let candidates = self.search_similar(title, &summary, collection, max_candidates).await;
        let (raw_action, reason, updated_id) = self.classify(title, &summary, &candidates).await;

        let _ = source_url;
        Ok(ResolutionResult { action: map_action(raw_action), reason, updated_id, summary, candidates })
    }

    async fn summarize(&self, content: &str) -> String {
        let truncated: String = content.chars().take(SUMMARY_SOURCE_CHARS).collect();
        let prompt = format!(
            "Tóm tắt thông báo sau trong <=80 từ để dùng cho hệ thống triage.\n\
             Chỉ trả lời phần tóm tắt tiếng Việt, không thêm giải thích.\n\n{truncated}"
        );
        match self.llm.generate(LlmMode::Qa, &prompt, &GenerationConfig::default()).await {
            Ok(summary) => {
                let trimmed = summary.trim();
                if trimmed.is_empty() {
                    fallback_summary(content)
                } else {
                    trimmed.to_string()
                }
            }
            Err(err) => {
                warn!(error = %err, "LLM summary failed, falling back to truncated content");
                fallback_summary(content)
            }
        }
    }

    async fn search_similar(
        &self,
        title: &str,
        summary: &str,
        collection: &str,
        max_candidates: usize,
    ) -> Vec<CandidateDocument> {
        let combined = format!("Tiêu đề: {title}\nTóm tắt: {summary}");
        let query_vector = match self.embedding.embed(&combined).await {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "embedding failed during candidate search");
                return Vec::new();
            }
        };

        let results = match self
            .vector_index
            .search(collection, &query_vector, max_candidates, 0.0, None)
            .await
        {
            Ok(r) => r,
            Err(err) => {
                warn!(error = %err, "vector search failed during candidate search");
                return Vec::new();
            }
        };

        results
            .into_iter()
            .map(|scored| {
                let metadata = &scored.record.payload.metadata;
                let id = metadata
                    .get("document_id")
                    .or_else(|| metadata.get("doc_id"))
                    .and_then(|v| v.as_str())
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .or(Some(scored.record.payload.source_id));
                let title = metadata
                    .get("title")
                    .or_else(|| metadata.get("file_name"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let summary = metadata
                    .get("summary")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| truncate_chars(&scored.record.payload.content, CANDIDATE_SUMMARY_CHARS));
                let source_url =
                    metadata.get("source_url").and_then(|v| v.as_str()).map(str::to_string);

                CandidateDocument { id, title, summary, score: scored.score, source_url }
            })
            .collect()
    }

    async fn classify(
        &self,
        title: &str,
        summary: &str,
        candidates: &[CandidateDocument],
    ) -> (i64, Option<String>, Option<Uuid>) {
        let candidate_block = if candidates.is_empty() {
            "Không có dữ liệu gần nhất.".to_string()
        } else {
            candidates
                .iter()
                .enumerate()
                .map(|(idx, c)| {
                    format!(
                        "{}. id={}; score={:.3}; title={}; source={}; summary={}",
                        idx + 1,
                        c.id.map(|i| i.to_string()).unwrap_or_else(|| "null".to_string()),
                        c.score,
                        c.title.as_deref().unwrap_or("null"),
                        c.source_url.as_deref().unwrap_or("null"),
                        c.summary,
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = format!(
            "Bạn là hệ thống phân loại thông báo.\n\
             Quy tắc:\n\
             - action=1 nếu nội dung mới và hữu ích.\n\
             - action=0 nếu giá trị thấp/không liên quan.\n\
             - action=2 nếu đây là bản cập nhật của một nội dung cũ (ghi rõ updated_id nếu biết).\n\n\
             Thông báo mới:\nTiêu đề: {title}\nTóm tắt: {summary}\n\n\
             Các thông báo gần nhất:\n{candidate_block}\n\n\
             Chỉ trả về JSON: {{\"action\":1|0|2,\"reason\":\"...\", \"updated_id\":\"id|null\"}}"
        );

        match self.llm.generate(LlmMode::Reasoning, &prompt, &GenerationConfig::default()).await {
            Ok(raw) => {
                let parsed = parse_outermost_json(&raw);
                let action = parsed.get("action").and_then(|v| v.as_i64()).unwrap_or(1);
                let reason = parsed.get("reason").and_then(|v| v.as_str()).map(str::to_string);
                let updated_id = parsed
                    .get("updated_id")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty() && *s != "null")
                    .and_then(|s| Uuid::parse_str(s).ok());
                (action, reason, updated_id)
            }
            Err(err) => {
                warn!(error = %err, "LLM classification failed, defaulting to new");
                (1, None, None)
            }
        }
    }
}

fn map_action(raw_action: i64) -> DetectionType {
    match raw_action {
        2 => DetectionType::Update,
        0 => DetectionType::Unrelated,
        _ => DetectionType::New,
    }
}

fn fallback_summary(content: &str) -> String {
    truncate_chars(content, SUMMARY_FALLBACK_CHARS)
}

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn parse_outermost_json(raw: &str) -> serde_json::Value {
    if let Ok(value) = serde_json::from_str(raw) {
        return value;
    }
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&raw[start..=end]) {
                return value;
            }
        }
    }
    serde_json::Value::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_action_mapping() {
        assert_eq!(map_action(0), DetectionType::Unrelated);
        assert_eq!(map_action(1), DetectionType::New);
        assert_eq!(map_action(2), DetectionType::Update);
        assert_eq!(map_action(99), DetectionType::New);
    }

    #[test]
    fn malformed_json_falls_back_to_empty_object() {
        let value = parse_outermost_json("not json at all");
        assert!(value.get("action").is_none());
    }
}
