//! Azure OpenAI chat-completion provider

use super::client::AzureOpenAIClient;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, Message, ResponseFormat};
use crate::{CompletionProvider, Prompt};
use async_trait::async_trait;
use foundry_core::{FoundryError, FoundryResult};
use std::sync::Arc;

/// Sampling temperature for extraction calls.
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Completion provider backed by an Azure OpenAI chat deployment.
pub struct AzureOpenAICompletionProvider {
    client: Arc<AzureOpenAIClient>,
    deployment: String,
    temperature: f32,
}

impl AzureOpenAICompletionProvider {
    pub fn new(client: Arc<AzureOpenAIClient>, deployment: impl Into<String>) -> Self {
        Self {
            client,
            deployment: deployment.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request(&self, prompt: &Prompt) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if !prompt.system.is_empty() {
            messages.push(Message::system(&prompt.system));
        }
        messages.push(Message::user(&prompt.user));

        ChatCompletionRequest {
            messages,
            temperature: Some(self.temperature),
            response_format: prompt.json.then(ResponseFormat::json_object),
        }
    }
}

#[async_trait]
impl CompletionProvider for AzureOpenAICompletionProvider {
    async fn complete(&self, prompt: &Prompt) -> FoundryResult<String> {
        let response: ChatCompletionResponse = self
            .client
            .post(&self.deployment, "chat/completions", &self.request(prompt))
            .await?;
        text_from_response(response)
    }

    fn model_id(&self) -> &str {
        &self.deployment
    }
}

fn text_from_response(response: ChatCompletionResponse) -> FoundryResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| FoundryError::invalid_response("azure-openai", "No content in completion response"))
}

impl std::fmt::Debug for AzureOpenAICompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAICompletionProvider")
            .field("deployment", &self.deployment)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::AzureCredential;
    use std::time::Duration;

    fn provider() -> AzureOpenAICompletionProvider {
        let client = AzureOpenAIClient::new(
            "https://res.openai.azure.com",
            "2024-10-21",
            AzureCredential::Bearer("t".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        AzureOpenAICompletionProvider::new(Arc::new(client), "gpt-4o")
    }

    #[test]
    fn test_json_prompt_sets_response_format() {
        let request = provider().request(&Prompt::new("sys", "usr").json());
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_plain_prompt_without_system_message() {
        let body = serde_json::to_value(provider().request(&Prompt::new("", "hi"))).unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_response_text_extraction() {
        let response: ChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"index": 0, "finish_reason": "stop",
                         "message": {"role": "assistant", "content": "{\"title\":\"x\"}"}}]
        }))
        .unwrap();
        assert_eq!(text_from_response(response).unwrap(), "{\"title\":\"x\"}");

        let empty: ChatCompletionResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(text_from_response(empty).is_err());
    }
}
