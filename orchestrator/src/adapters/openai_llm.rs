//! `LlmPort` default adapter over the OpenAI chat completions API,
//! grounded on `embedding/src/services/llm/openai.rs`'s
//! `async_openai::Client<OpenAIConfig>` wrapper, generalized from
//! embeddings-only to QA/reasoning chat and vision.

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    CreateChatCompletionRequestArgs, ImageUrlArgs,
};
use async_openai::Client as OpenAiClient;
use async_trait::async_trait;
use base64::Engine;
use conhub_ports::llm::{GenerationConfig, LlmMode, LlmPort, VisionAnalysis};
use conhub_ports::{PortError, PortResult};

const QA_SYSTEM_PROMPT: &str = "Bạn là trợ lý trả lời câu hỏi, ngắn gọn và chính xác.";
const REASONING_SYSTEM_PROMPT: &str =
    "Bạn là hệ thống suy luận/triage, chỉ trả lời theo định dạng được yêu cầu.";

pub struct OpenAiLlm {
    client: OpenAiClient<OpenAIConfig>,
    qa_model: String,
    reasoning_model: String,
    vision_model: String,
}

impl OpenAiLlm {
    pub fn new(api_key: &str, base_url: &str, qa_model: impl Into<String>, reasoning_model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key).with_api_base(base_url);
        let reasoning_model = reasoning_model.into();
        Self {
            client: OpenAiClient::with_config(config),
            qa_model: qa_model.into(),
            vision_model: reasoning_model.clone(),
            reasoning_model,
        }
    }

    fn model_for(&self, mode: LlmMode) -> &str {
        match mode {
            LlmMode::Qa => &self.qa_model,
            LlmMode::Reasoning => &self.reasoning_model,
        }
    }

    fn system_prompt_for(mode: LlmMode) -> &'static str {
        match mode {
            LlmMode::Qa => QA_SYSTEM_PROMPT,
            LlmMode::Reasoning => REASONING_SYSTEM_PROMPT,
        }
    }
}

#[async_trait]
impl LlmPort for OpenAiLlm {
    async fn generate(&self, mode: LlmMode, prompt: &str, config: &GenerationConfig) -> PortResult<String> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(Self::system_prompt_for(mode))
            .build()
            .map_err(|e| PortError::internal(e.to_string()))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::internal(e.to_string()))?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(self.model_for(mode))
            .temperature(config.temperature)
            .top_p(config.top_p)
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ]);
        if let Some(max_tokens) = config.max_tokens {
            request.max_tokens(max_tokens);
        }
        let request = request.build().map_err(|e| PortError::internal(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PortError::dependency_unavailable("no completion returned"))
    }

    async fn analyze_image(
        &self,
        image_bytes: &[u8],
        image_format: &str,
        question: Option<&str>,
    ) -> PortResult<VisionAnalysis> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let data_url = format!("data:image/{image_format};base64,{encoded}");

        let prompt = question.unwrap_or(
            "Mô tả nội dung hình ảnh, trích xuất văn bản nếu có, và liệt kê các đối tượng nhận diện được. \
             Trả về JSON: {\"description\":\"...\",\"extracted_text\":\"...\",\"detected_objects\":[\"...\"]}",
        );

        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(ImageUrlArgs::default().url(data_url).build().map_err(|e| PortError::internal(e.to_string()))?)
            .build()
            .map_err(|e| PortError::internal(e.to_string()))?;
        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(prompt)
            .build()
            .map_err(|e| PortError::internal(e.to_string()))?;

        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(vec![text_part.into(), image_part.into()]))
            .build()
            .map_err(|e| PortError::internal(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.vision_model)
            .messages(vec![ChatCompletionRequestMessage::User(user)])
            .build()
            .map_err(|e| PortError::internal(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        let raw = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PortError::dependency_unavailable("no vision completion returned"))?;

        Ok(parse_vision_analysis(&raw))
    }
}

fn parse_vision_analysis(raw: &str) -> VisionAnalysis {
    let json = if let Ok(v) = serde_json::from_str::<serde_json::Value>(raw) {
        v
    } else if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            serde_json::from_str(&raw[start..=end]).unwrap_or(serde_json::Value::Null)
        } else {
            serde_json::Value::Null
        }
    } else {
        serde_json::Value::Null
    };

    let description = json
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string());
    let extracted_text = json.get("extracted_text").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let detected_objects = json
        .get("detected_objects")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    VisionAnalysis { description, extracted_text, detected_objects }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_vision_json() {
        let raw = r#"{"description":"a cat","extracted_text":"","detected_objects":["cat","sofa"]}"#;
        let analysis = parse_vision_analysis(raw);
        assert_eq!(analysis.description, "a cat");
        assert_eq!(analysis.detected_objects, vec!["cat", "sofa"]);
    }

    #[test]
    fn falls_back_to_raw_text_when_not_json() {
        let analysis = parse_vision_analysis("just a plain description");
        assert_eq!(analysis.description, "just a plain description");
        assert!(analysis.detected_objects.is_empty());
    }
}
