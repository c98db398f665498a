//! S6 Synthesize (spec.md §4.9): combines tool outputs into the final
//! answer. Form answers take precedence; web results are labeled; RAG
//! sources are numbered to match what's shown to the user; clarifications
//! are emitted verbatim.

use conhub_models::document::Document;
use conhub_models::orchestration::ToolType as ModelToolType;
use rag::SearchResultItem;
use std::collections::HashMap;
use uuid::Uuid;

use super::execute::RecordedToolCall;
use super::types::{SourceDto, SourceType};

pub const FALLBACK_ANSWER: &str = "Xin lỗi, hiện không thể trả lời câu hỏi này.";
const SOURCE_CHUNK_CHARS: usize = 200;

fn output_str<'a>(output: &'a Option<tools::ToolArgs>, key: &str) -> Option<&'a str> {
    output.as_ref().and_then(|o| o.get(key)).and_then(|v| v.as_str())
}

/// Picks the content-bearing call for a given tool type, preferring a
/// succeeded call over a failed one so a sequential follow-up failure
/// degrades gracefully to the primary's own output.
fn find_succeeded<'a>(calls: &'a [RecordedToolCall], tool_type: ModelToolType) -> Option<&'a RecordedToolCall> {
    calls.iter().find(|c| c.tool_type == tool_type && c.output.is_some())
}

pub fn synthesize_content(calls: &[RecordedToolCall], primary: ModelToolType) -> String {
    match primary {
        ModelToolType::FillForm => {
            if let Some(call) = find_succeeded(calls, ModelToolType::FillForm) {
                let form_markdown = output_str(&call.output, "form_markdown").unwrap_or_default();
                format!("Mình đã chuẩn bị mẫu đơn cho bạn:\n\n{form_markdown}")
            } else {
                FALLBACK_ANSWER.to_string()
            }
        }
        ModelToolType::ClarifyQuestion => find_succeeded(calls, ModelToolType::ClarifyQuestion)
            .and_then(|c| output_str(&c.output, "clarification_question"))
            .unwrap_or(FALLBACK_ANSWER)
            .to_string(),
        ModelToolType::SearchWeb => {
            if let Some(call) = find_succeeded(calls, ModelToolType::SearchWeb) {
                let summary = output_str(&call.output, "summary").unwrap_or_default();
                format!("Theo kết quả tìm kiếm trên web:\n\n{summary}")
            } else {
                FALLBACK_ANSWER.to_string()
            }
        }
        ModelToolType::AnalyzeImage => {
            let vision = find_succeeded(calls, ModelToolType::AnalyzeImage)
                .and_then(|c| output_str(&c.output, "response"));
            let followup = find_succeeded(calls, ModelToolType::UseRagContext)
                .and_then(|c| output_str(&c.output, "answer"));
            match (vision, followup) {
                (Some(vision), Some(followup)) => format!("{vision}\n\n{followup}"),
                (Some(vision), None) => vision.to_string(),
                (None, Some(followup)) => followup.to_string(),
                (None, None) => FALLBACK_ANSWER.to_string(),
            }
        }
        ModelToolType::UseRagContext => find_succeeded(calls, ModelToolType::UseRagContext)
            .and_then(|c| output_str(&c.output, "answer"))
            .unwrap_or(FALLBACK_ANSWER)
            .to_string(),
        ModelToolType::AnswerDirectly => find_succeeded(calls, ModelToolType::AnswerDirectly)
            .and_then(|c| output_str(&c.output, "answer"))
            .unwrap_or(FALLBACK_ANSWER)
            .to_string(),
    }
}

/// Numbers RAG sources `[1], [2], …` in retrieval order, matching what
/// `use_rag_context`'s rendered context shows the user.
pub fn rag_sources(results: &[SearchResultItem], documents: &HashMap<Uuid, Document>) -> Vec<SourceDto> {
    results
        .iter()
        .map(|r| {
            let document = documents.get(&r.source_id);
            let chunk_text = if r.content.chars().count() > SOURCE_CHUNK_CHARS {
                format!("{}...", r.content.chars().take(SOURCE_CHUNK_CHARS).collect::<String>())
            } else {
                r.content.clone()
            };
            SourceDto {
                source_type: SourceType::Document,
                document_id: Some(r.source_id),
                title: document.map(|d| d.title.clone()),
                url: None,
                chunk_text: Some(chunk_text),
                relevance_score: r.score,
            }
        })
        .collect()
}

pub fn web_sources(calls: &[RecordedToolCall]) -> Vec<SourceDto> {
    let Some(call) = find_succeeded(calls, ModelToolType::SearchWeb) else { return Vec::new() };
    let Some(results) = call.output.as_ref().and_then(|o| o.get("results")).and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    results
        .iter()
        .map(|r| SourceDto {
            source_type: SourceType::WebSearch,
            document_id: None,
            title: r.get("title").and_then(|v| v.as_str()).map(str::to_string),
            url: r.get("url").and_then(|v| v.as_str()).map(str::to_string),
            chunk_text: r.get("snippet").and_then(|v| v.as_str()).map(str::to_string),
            relevance_score: 0.0,
        })
        .collect()
}

pub fn direct_knowledge_source(calls: &[RecordedToolCall]) -> Vec<SourceDto> {
    if find_succeeded(calls, ModelToolType::AnswerDirectly).is_none() {
        return Vec::new();
    }
    vec![SourceDto {
        source_type: SourceType::DirectKnowledge,
        document_id: None,
        title: None,
        url: None,
        chunk_text: None,
        relevance_score: 0.0,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(tool_type: ModelToolType, output: tools::ToolArgs) -> RecordedToolCall {
        RecordedToolCall { tool_type, output: Some(output), execution_time_ms: 1, error: None }
    }

    #[test]
    fn clarification_is_emitted_verbatim() {
        let mut output = tools::ToolArgs::new();
        output.insert("clarification_question".into(), serde_json::json!("Bạn muốn hỏi gì cụ thể hơn?"));
        let calls = vec![call(ModelToolType::ClarifyQuestion, output)];
        assert_eq!(synthesize_content(&calls, ModelToolType::ClarifyQuestion), "Bạn muốn hỏi gì cụ thể hơn?");
    }

    #[test]
    fn failed_primary_with_no_output_falls_back() {
        let calls = vec![RecordedToolCall {
            tool_type: ModelToolType::UseRagContext,
            output: None,
            execution_time_ms: 5,
            error: Some("boom".to_string()),
        }];
        assert_eq!(synthesize_content(&calls, ModelToolType::UseRagContext), FALLBACK_ANSWER);
    }
}
