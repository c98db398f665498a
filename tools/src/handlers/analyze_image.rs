use std::sync::Arc;

use async_trait::async_trait;
use conhub_ports::llm::LlmPort;
use conhub_ports::{PortError, PortResult};
use rag::{RagEngine, SearchConfig};

use crate::types::{get_str, get_str_owned, ToolArgs, ToolOutput, ToolType};
use crate::ToolHandler;

/// **analyze_image** (§4.8): runs the vision model, then re-runs retrieval
/// using the vision description plus any accompanying question.
pub struct AnalyzeImageHandler {
    llm: Arc<dyn LlmPort>,
    rag_engine: Arc<RagEngine>,
}

impl AnalyzeImageHandler {
    pub fn new(llm: Arc<dyn LlmPort>, rag_engine: Arc<RagEngine>) -> Self {
        Self { llm, rag_engine }
    }
}

#[async_trait]
impl ToolHandler for AnalyzeImageHandler {
    fn tool_type(&self) -> ToolType {
        ToolType::AnalyzeImage
    }

    fn validate(&self, arguments: &ToolArgs) -> PortResult<()> {
        if arguments.contains_key("image_bytes") && arguments.contains_key("image_format") {
            Ok(())
        } else {
            Err(PortError::invalid("analyze_image requires image_bytes and image_format"))
        }
    }

    async fn execute(&self, arguments: ToolArgs) -> PortResult<ToolOutput> {
        let image_bytes: Vec<u8> = arguments
            .get("image_bytes")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|b| b.as_u64().map(|n| n as u8)).collect())
            .ok_or_else(|| PortError::invalid("image_bytes must be a byte array"))?;
        let image_format = get_str(&arguments, "image_format").unwrap_or("png");
        let question = get_str(&arguments, "question");

        let analysis = self.llm.analyze_image(&image_bytes, image_format, question).await?;

        let collection = get_str_owned(&arguments, "collection").unwrap_or_else(|| "default".to_string());
        let search_query = match question {
            Some(q) => format!("{} {}", analysis.description, q),
            None => analysis.description.clone(),
        };
        let config = SearchConfig { collection, top_k: 5, deduplicate: true, ..Default::default() };
        let related = self.rag_engine.search(&search_query, &config).await.unwrap_or_default();

        let response = if let Some(q) = question {
            format!("{}\n\nLiên quan đến câu hỏi \"{}\": {}", analysis.description, q, analysis.extracted_text)
        } else {
            analysis.description.clone()
        };

        let mut output = ToolOutput::new();
        output.insert("description".into(), serde_json::json!(analysis.description));
        output.insert("extracted_text".into(), serde_json::json!(analysis.extracted_text));
        output.insert("detected_objects".into(), serde_json::json!(analysis.detected_objects));
        output.insert("response".into(), serde_json::json!(response));
        output.insert(
            "related_documents".into(),
            serde_json::json!(related.iter().map(|r| serde_json::json!({
                "source_id": r.source_id,
                "content": r.content,
                "score": r.score,
            })).collect::<Vec<_>>()),
        );
        Ok(output)
    }
}
