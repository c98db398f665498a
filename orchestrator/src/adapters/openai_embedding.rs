//! `EmbeddingProvider` default adapter over the OpenAI embeddings API,
//! grounded on `embedding/src/services/embedding.rs`'s `LlmEmbeddingService`
//! (generalized from its `anyhow`-based client trait to the typed
//! `EmbeddingProvider` port, matching `OpenAiLlm`'s adapter idiom).

use async_openai::config::OpenAIConfig;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_openai::Client as OpenAiClient;
use async_trait::async_trait;
use conhub_ports::{PortError, PortResult};
use embedding::EmbeddingProvider;

pub struct OpenAiEmbeddingProvider {
    client: OpenAiClient<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: &str, base_url: &str, model: impl Into<String>, dimension: usize) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key).with_api_base(base_url);
        Self { client: OpenAiClient::with_config(config), model: model.into(), dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_one(&self, text: &str) -> PortResult<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text)
            .build()
            .map_err(|e| PortError::internal(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| PortError::dependency_unavailable(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| PortError::internal("embedding response had no data"))
    }
}
