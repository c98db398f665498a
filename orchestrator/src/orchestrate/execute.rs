//! S5 Execute (spec.md §4.9, §4.9a): runs the tool(s) S4 selected under a
//! per-tool deadline, and independently attaches artifacts for every
//! retrieved source whose document carries one.

use std::collections::HashMap;

use conhub_models::document::Document;
use conhub_models::orchestration::ToolType as ModelToolType;
use conhub_ports::object_store::ObjectStorePort;
use rag::SearchResultItem;
use tools::{ToolArgs, ToolExecutionResult, ToolRegistry, ToolType};
use tracing::warn;
use uuid::Uuid;

use super::types::{format_size, ArtifactDto};

/// Default presigned download URL lifetime (§4.9a).
const ARTIFACT_URL_TTL_SECONDS: u64 = 3600;

pub fn to_model_tool_type(tool_type: ToolType) -> ModelToolType {
    match tool_type {
        ToolType::UseRagContext => ModelToolType::UseRagContext,
        ToolType::SearchWeb => ModelToolType::SearchWeb,
        ToolType::AnswerDirectly => ModelToolType::AnswerDirectly,
        ToolType::FillForm => ModelToolType::FillForm,
        ToolType::ClarifyQuestion => ModelToolType::ClarifyQuestion,
        ToolType::AnalyzeImage => ModelToolType::AnalyzeImage,
    }
}

#[derive(Debug, Clone)]
pub struct RecordedToolCall {
    pub tool_type: ModelToolType,
    pub output: Option<ToolArgs>,
    pub execution_time_ms: u64,
    pub error: Option<String>,
}

impl From<ToolExecutionResult> for RecordedToolCall {
    fn from(result: ToolExecutionResult) -> Self {
        Self {
            tool_type: to_model_tool_type(result.tool_type),
            output: result.output,
            execution_time_ms: result.execution_time_ms,
            error: result.error,
        }
    }
}

/// Maps a query to one of the named templates in `tools::handlers::templates`.
/// The original agentic tool-calling flow let the LLM choose `form_type`
/// freely; the deterministic S4/S5 split here needs an explicit rule
/// instead, so this falls back to `general_request` when nothing matches.
pub fn infer_form_type(query: &str) -> &'static str {
    let q = query.to_lowercase();
    if q.contains("nghỉ học") || q.contains("nghỉ phép") {
        "leave_request"
    } else if q.contains("thẻ sinh viên") || q.contains("cấp lại thẻ") || q.contains("đổi thẻ") {
        "card_replacement"
    } else if q.contains("chứng nhận") || q.contains("giấy xác nhận") {
        "certificate_request"
    } else if q.contains("phúc khảo") || q.contains("điểm thi") {
        "exam_review"
    } else {
        "general_request"
    }
}

pub fn build_args(tool_type: ToolType, query: &str, collection: &str, confidence: &str, user_id: Option<&str>, results: &[SearchResultItem]) -> ToolArgs {
    let mut args = ToolArgs::new();
    match tool_type {
        ToolType::UseRagContext => {
            let chunk_ids: Vec<serde_json::Value> =
                results.iter().map(|r| serde_json::json!(r.chunk_id)).collect();
            if chunk_ids.is_empty() {
                args.insert("query".into(), serde_json::json!(query));
            } else {
                args.insert("chunk_ids".into(), serde_json::json!(chunk_ids));
            }
            args.insert("collection".into(), serde_json::json!(collection));
            args.insert("confidence".into(), serde_json::json!(confidence));
        }
        ToolType::SearchWeb => {
            args.insert("query".into(), serde_json::json!(query));
        }
        ToolType::AnswerDirectly => {
            args.insert("query".into(), serde_json::json!(query));
            args.insert("reason".into(), serde_json::json!("general knowledge"));
        }
        ToolType::FillForm => {
            args.insert("form_type".into(), serde_json::json!(infer_form_type(query)));
            if let Some(user_id) = user_id {
                args.insert("user_context".into(), serde_json::json!(user_id));
            }
            args.insert("additional_info".into(), serde_json::json!({}));
        }
        ToolType::ClarifyQuestion => {
            args.insert("clarification_type".into(), serde_json::json!("ambiguous_topic"));
            args.insert("topic".into(), serde_json::json!(query));
        }
        ToolType::AnalyzeImage => {
            // Populated by the caller once image bytes are available.
        }
    }
    args
}

fn vision_followup_query(analyze_output: &ToolArgs, original_query: &str) -> String {
    let description = analyze_output.get("description").and_then(|v| v.as_str()).unwrap_or_default();
    format!("{description} {original_query}").trim().to_string()
}

/// Runs the primary tool, then the sequential follow-up (if any) using the
/// primary's output, under the registry's per-tool deadline.
#[allow(clippy::too_many_arguments)]
pub async fn run_tools(
    registry: &ToolRegistry,
    primary: ToolType,
    sequential_followup: Option<ToolType>,
    query: &str,
    collection: &str,
    confidence: &str,
    user_id: Option<&str>,
    results: &[SearchResultItem],
    image: Option<(&[u8], &str, Option<&str>)>,
) -> Vec<RecordedToolCall> {
    let mut calls = Vec::new();

    let primary_args = if primary == ToolType::AnalyzeImage {
        let mut args = ToolArgs::new();
        if let Some((bytes, format, question)) = image {
            let byte_values: Vec<serde_json::Value> = bytes.iter().map(|b| serde_json::json!(b)).collect();
            args.insert("image_bytes".into(), serde_json::json!(byte_values));
            args.insert("image_format".into(), serde_json::json!(format));
            if let Some(question) = question {
                args.insert("question".into(), serde_json::json!(question));
            }
            args.insert("collection".into(), serde_json::json!(collection));
        }
        args
    } else {
        build_args(primary, query, collection, confidence, user_id, results)
    };

    let primary_result = registry.execute(primary, primary_args).await;
    let primary_output = primary_result.output.clone();
    calls.push(RecordedToolCall::from(primary_result));

    if let Some(followup) = sequential_followup {
        let followup_query = primary_output
            .as_ref()
            .map(|output| vision_followup_query(output, query))
            .unwrap_or_else(|| query.to_string());
        let followup_args = build_args(followup, &followup_query, collection, "medium", user_id, &[]);
        let followup_result = registry.execute(followup, followup_args).await;
        calls.push(RecordedToolCall::from(followup_result));
    }

    calls
}

/// Looks up the distinct documents backing a set of retrieved chunks, so S4
/// can check "top chunk is a form template" and S5 can attach artifacts.
pub async fn load_source_documents(
    document_store: &dyn conhub_ports::document_store::DocumentStorePort,
    results: &[SearchResultItem],
) -> HashMap<Uuid, Document> {
    let mut documents = HashMap::new();
    for source_id in results.iter().map(|r| r.source_id).collect::<std::collections::HashSet<_>>() {
        match document_store.get_by_id(source_id).await {
            Ok(Some(document)) => {
                documents.insert(source_id, document);
            }
            Ok(None) => {}
            Err(e) => warn!(source_id = %source_id, error = %e, "failed to load source document for artifact attachment"),
        }
    }
    documents
}

/// §4.9a: for every retrieved source whose document has artifacts, surface
/// each as an `ArtifactDto` with a presigned download URL and, when
/// previewable, a preview URL. Skips non-fillable artifacts when the query
/// wants a fillable form.
pub async fn attach_artifacts(
    object_store: &dyn ObjectStorePort,
    results: &[SearchResultItem],
    documents: &HashMap<Uuid, Document>,
    wants_fillable_form: bool,
) -> Vec<ArtifactDto> {
    let mut seen_sources = std::collections::HashSet::new();
    let mut artifacts = Vec::new();

    for result in results {
        if !seen_sources.insert(result.source_id) {
            continue;
        }
        let Some(document) = documents.get(&result.source_id) else { continue };

        for (index, artifact) in document.artifacts.iter().enumerate() {
            if wants_fillable_form && !artifact.is_fillable {
                continue;
            }

            let download_url = match object_store.presign(&artifact.storage_key, ARTIFACT_URL_TTL_SECONDS).await {
                Ok(url) => url,
                Err(e) => {
                    warn!(storage_key = %artifact.storage_key, error = %e, "failed to presign artifact download url");
                    continue;
                }
            };
            let preview_url = if artifact.is_previewable() {
                object_store.presign(&artifact.storage_key, ARTIFACT_URL_TTL_SECONDS).await.ok()
            } else {
                None
            };

            artifacts.push(ArtifactDto {
                artifact_id: format!("{}_artifact_{index}", document.id),
                document_id: document.id,
                file_name: artifact.file_name.clone(),
                artifact_type: serde_json::to_value(artifact.artifact_type)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| "other".to_string()),
                download_url,
                preview_url,
                size_bytes: artifact.size_bytes,
                size_display: format_size(artifact.size_bytes),
                is_fillable: artifact.is_fillable,
                fill_fields: artifact.fill_fields.clone(),
            });
        }
    }

    artifacts
}

pub fn top_is_form_template(documents: &HashMap<Uuid, Document>, results: &[SearchResultItem]) -> bool {
    results
        .first()
        .and_then(|r| documents.get(&r.source_id))
        .map(|doc| doc.artifacts.iter().any(|a| a.artifact_type == conhub_models::document::ArtifactType::Form))
        .unwrap_or(false)
}

pub fn any_source_has_artifacts(documents: &HashMap<Uuid, Document>, results: &[SearchResultItem]) -> bool {
    results.iter().any(|r| documents.get(&r.source_id).map(|d| d.has_artifacts()).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_leave_request_from_keyword() {
        assert_eq!(infer_form_type("cho mình xin mẫu đơn nghỉ học"), "leave_request");
    }

    #[test]
    fn falls_back_to_general_request() {
        assert_eq!(infer_form_type("mình cần một cái đơn gì đó"), "general_request");
    }
}
