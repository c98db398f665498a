use std::sync::Arc;

use async_trait::async_trait;
use conhub_ports::llm::{GenerationConfig, LlmMode, LlmPort};
use conhub_ports::vector_index::VectorIndexPort;
use conhub_ports::{PortError, PortResult};
use rag::{RagEngine, SearchConfig};
use uuid::Uuid;

use crate::types::{get_str, get_str_owned, ToolArgs, ToolOutput, ToolType};
use crate::ToolHandler;

/// **use_rag_context** (§4.8): resolves chunk contents either from
/// `chunk_ids` (re-fetched from C3) or from a fresh `query` search via C6,
/// then asks the LLM to answer strictly from the rendered source block.
pub struct UseRagContextHandler {
    rag_engine: Arc<RagEngine>,
    vector_index: Arc<dyn VectorIndexPort>,
    llm: Arc<dyn LlmPort>,
}

impl UseRagContextHandler {
    pub fn new(rag_engine: Arc<RagEngine>, vector_index: Arc<dyn VectorIndexPort>, llm: Arc<dyn LlmPort>) -> Self {
        Self { rag_engine, vector_index, llm }
    }
}

#[async_trait]
impl ToolHandler for UseRagContextHandler {
    fn tool_type(&self) -> ToolType {
        ToolType::UseRagContext
    }

    fn validate(&self, arguments: &ToolArgs) -> PortResult<()> {
        if arguments.contains_key("chunk_ids") || arguments.contains_key("query") {
            Ok(())
        } else {
            Err(PortError::invalid("use_rag_context requires chunk_ids or query"))
        }
    }

    async fn execute(&self, arguments: ToolArgs) -> PortResult<ToolOutput> {
        let collection = get_str_owned(&arguments, "collection").unwrap_or_else(|| "default".to_string());
        let confidence = get_str_owned(&arguments, "confidence").unwrap_or_else(|| "medium".to_string());

        let (sources_text, source_descriptors) = if let Some(ids) = arguments.get("chunk_ids").and_then(|v| v.as_array())
        {
            let mut texts = Vec::new();
            let mut descriptors = Vec::new();
            for (index, id_value) in ids.iter().enumerate() {
                let Some(id_str) = id_value.as_str() else { continue };
                let Ok(id) = Uuid::parse_str(id_str) else { continue };
                if let Some(record) = self.vector_index.get(&collection, id).await? {
                    texts.push(format!("[{}] {}", index + 1, record.payload.content));
                    descriptors.push(serde_json::json!({
                        "chunk_id": id,
                        "source_id": record.payload.source_id,
                        "score": null,
                    }));
                }
            }
            (texts.join("\n\n"), descriptors)
        } else {
            let query = get_str(&arguments, "query")
                .ok_or_else(|| PortError::invalid("use_rag_context requires query when chunk_ids absent"))?;
            let config = SearchConfig { collection, top_k: 5, deduplicate: true, ..Default::default() };
            let context = self.rag_engine.build_context(query, &config).await?;
            let descriptors = context
                .results
                .iter()
                .map(|r| serde_json::json!({"chunk_id": r.chunk_id, "source_id": r.source_id, "score": r.score}))
                .collect();
            (context.rendered_text, descriptors)
        };

        let prompt = format!(
            "Answer the question strictly using only the information in the sources below. \
             If the sources do not contain the answer, say so.\n\nSources:\n{sources_text}"
        );
        let answer = self.llm.generate(LlmMode::Qa, &prompt, &GenerationConfig::default()).await?;

        let mut output = ToolOutput::new();
        output.insert("answer".into(), serde_json::json!(answer));
        output.insert("sources".into(), serde_json::json!(source_descriptors));
        output.insert("confidence".into(), serde_json::json!(confidence));
        Ok(output)
    }
}
