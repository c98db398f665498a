use async_trait::async_trait;

use crate::PortResult;

/// QA mode favors concise grounded answers; reasoning mode favors
/// structured/triage-style JSON output; vision accepts an image (§1, §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmMode {
    Qa,
    Reasoning,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: None, top_p: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub struct VisionAnalysis {
    pub description: String,
    pub extracted_text: String,
    pub detected_objects: Vec<String>,
}

/// One or more language-model ports with QA vs. reasoning modes and vision.
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn generate(&self, mode: LlmMode, prompt: &str, config: &GenerationConfig) -> PortResult<String>;

    async fn analyze_image(
        &self,
        image_bytes: &[u8],
        image_format: &str,
        question: Option<&str>,
    ) -> PortResult<VisionAnalysis>;
}
