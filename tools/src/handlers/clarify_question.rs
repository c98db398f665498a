use async_trait::async_trait;
use conhub_ports::{PortError, PortResult};

use crate::types::{get_str, get_str_owned, ToolArgs, ToolOutput, ToolType};
use crate::ToolHandler;

/// **clarify_question** (§4.8): either renders a templated question from
/// `clarification_type` + context, or passes through a caller-supplied
/// `clarification_prompt` verbatim.
pub struct ClarifyQuestionHandler;

impl ClarifyQuestionHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClarifyQuestionHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn render_question(clarification_type: &str, arguments: &ToolArgs) -> String {
    let missing_info = get_str(arguments, "missing_info");
    let topic = get_str(arguments, "topic");
    match clarification_type {
        "ambiguous_topic" => format!(
            "Bạn có thể nói rõ hơn bạn đang hỏi về chủ đề nào{}?",
            topic.map(|t| format!(" liên quan đến \"{t}\"")).unwrap_or_default()
        ),
        "missing_context" => format!(
            "Mình cần thêm thông tin{} để trả lời chính xác hơn, bạn có thể cung cấp không?",
            missing_info.map(|m| format!(" về {m}")).unwrap_or_default()
        ),
        "multiple_meanings" => "Câu hỏi của bạn có thể hiểu theo nhiều cách, bạn muốn hỏi về ý nào?".to_string(),
        "form_type" => "Bạn cần loại đơn/biểu mẫu nào cụ thể?".to_string(),
        "time_period" => "Bạn muốn hỏi về khoảng thời gian nào?".to_string(),
        _ => "Bạn có thể cung cấp thêm chi tiết cho câu hỏi của mình không?".to_string(),
    }
}

#[async_trait]
impl ToolHandler for ClarifyQuestionHandler {
    fn tool_type(&self) -> ToolType {
        ToolType::ClarifyQuestion
    }

    fn validate(&self, arguments: &ToolArgs) -> PortResult<()> {
        if arguments.contains_key("clarification_type") || arguments.contains_key("clarification_prompt") {
            Ok(())
        } else {
            Err(PortError::invalid(
                "clarify_question requires clarification_type or clarification_prompt",
            ))
        }
    }

    async fn execute(&self, arguments: ToolArgs) -> PortResult<ToolOutput> {
        let options: Vec<String> = arguments
            .get("options")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .or_else(|| {
                arguments
                    .get("suggestions")
                    .and_then(|v| v.as_array())
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            })
            .unwrap_or_default();

        let (question, clarification_type) = if let Some(prompt) = get_str(&arguments, "clarification_prompt") {
            (prompt.to_string(), "general".to_string())
        } else {
            let clarification_type = get_str_owned(&arguments, "clarification_type").unwrap_or_else(|| "general".to_string());
            (render_question(&clarification_type, &arguments), clarification_type)
        };

        let mut output = ToolOutput::new();
        output.insert("clarification_question".into(), serde_json::json!(question));
        output.insert("clarification_type".into(), serde_json::json!(clarification_type));
        output.insert("options".into(), serde_json::json!(options));
        Ok(output)
    }
}
