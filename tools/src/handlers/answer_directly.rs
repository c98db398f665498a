use std::sync::Arc;

use async_trait::async_trait;
use conhub_ports::llm::{GenerationConfig, LlmMode, LlmPort};
use conhub_ports::PortResult;

use crate::types::{get_str, get_str_owned, ToolArgs, ToolOutput, ToolType};
use crate::ToolHandler;

/// **answer_directly** (§4.8): uses `pre_answer` when supplied, otherwise
/// generates an answer via the LLM with no retrieval step.
pub struct AnswerDirectlyHandler {
    llm: Arc<dyn LlmPort>,
}

impl AnswerDirectlyHandler {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ToolHandler for AnswerDirectlyHandler {
    fn tool_type(&self) -> ToolType {
        ToolType::AnswerDirectly
    }

    fn validate(&self, _arguments: &ToolArgs) -> PortResult<()> {
        Ok(())
    }

    async fn execute(&self, arguments: ToolArgs) -> PortResult<ToolOutput> {
        let reasoning = get_str_owned(&arguments, "reason").unwrap_or_else(|| "general knowledge".to_string());

        let answer = if let Some(pre_answer) = get_str(&arguments, "pre_answer") {
            pre_answer.to_string()
        } else {
            let query = get_str(&arguments, "query").unwrap_or("");
            self.llm.generate(LlmMode::Qa, query, &GenerationConfig::default()).await?
        };

        let mut output = ToolOutput::new();
        output.insert("answer".into(), serde_json::json!(answer));
        output.insert("reasoning".into(), serde_json::json!(reasoning));
        Ok(output)
    }
}
