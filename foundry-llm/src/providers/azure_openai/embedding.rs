//! Azure OpenAI embedding provider implementation

use super::client::AzureOpenAIClient;
use super::types::{EmbeddingRequest, EmbeddingResponse};
use crate::EmbeddingProvider;
use async_trait::async_trait;
use foundry_core::{EmbeddingVector, FoundryError, FoundryResult};
use std::sync::Arc;

/// Embedding provider backed by an Azure OpenAI embedding deployment.
pub struct AzureOpenAIEmbeddingProvider {
    client: Arc<AzureOpenAIClient>,
    deployment: String,
    dimensions: i32,
}

impl AzureOpenAIEmbeddingProvider {
    /// # Arguments
    /// * `deployment` - Deployment name (e.g., "text-embedding-3-small")
    /// * `dimensions` - Requested output dimensions
    pub fn new(client: Arc<AzureOpenAIClient>, deployment: impl Into<String>, dimensions: i32) -> Self {
        Self {
            client,
            deployment: deployment.into(),
            dimensions,
        }
    }

    fn request(&self, text: &str) -> EmbeddingRequest {
        EmbeddingRequest {
            input: vec![text.to_string()],
            dimensions: Some(self.dimensions),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for AzureOpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> FoundryResult<EmbeddingVector> {
        let response: EmbeddingResponse = self
            .client
            .post(&self.deployment, "embeddings", &self.request(text))
            .await?;
        vector_from_response(response, &self.deployment)
    }

    fn dimensions(&self) -> i32 {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.deployment
    }
}

fn vector_from_response(response: EmbeddingResponse, model: &str) -> FoundryResult<EmbeddingVector> {
    let data = response
        .data
        .into_iter()
        .min_by_key(|d| d.index)
        .ok_or_else(|| FoundryError::invalid_response("azure-openai", "No embedding data in response"))?;
    Ok(EmbeddingVector::new(data.embedding, model))
}

impl std::fmt::Debug for AzureOpenAIEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAIEmbeddingProvider")
            .field("deployment", &self.deployment)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::AzureCredential;
    use std::time::Duration;

    fn provider() -> AzureOpenAIEmbeddingProvider {
        let client = AzureOpenAIClient::new(
            "https://res.openai.azure.com",
            "2024-10-21",
            AzureCredential::ApiKey("k".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        AzureOpenAIEmbeddingProvider::new(Arc::new(client), "text-embedding-3-small", 3)
    }

    #[test]
    fn test_request_carries_dimensions() {
        let body = serde_json::to_value(provider().request("hello")).unwrap();
        assert_eq!(body, serde_json::json!({"input": ["hello"], "dimensions": 3}));
    }

    #[test]
    fn test_response_mapping() {
        let response: EmbeddingResponse = serde_json::from_value(serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3]}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 1, "total_tokens": 1}
        }))
        .unwrap();
        let vector = vector_from_response(response, "text-embedding-3-small").unwrap();
        assert_eq!(vector.dimensions, 3);
        assert_eq!(vector.model_id, "text-embedding-3-small");
    }

    #[test]
    fn test_empty_data_is_invalid_response() {
        let response: EmbeddingResponse =
            serde_json::from_value(serde_json::json!({"data": []})).unwrap();
        let err = vector_from_response(response, "m").unwrap_err();
        assert!(matches!(err, FoundryError::InvalidResponse { .. }));
    }
}
