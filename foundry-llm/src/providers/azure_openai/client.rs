//! Azure OpenAI HTTP client with concurrency limiting

use super::types::ApiError;
use foundry_core::{ConfigError, FoundryError, FoundryResult, InferenceConfig};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

const SERVICE: &str = "azure-openai";
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// How requests authenticate against the inference endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum AzureCredential {
    /// Sent as the `api-key` header.
    ApiKey(String),
    /// Sent as `Authorization: Bearer`.
    Bearer(String),
}

impl std::fmt::Debug for AzureCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AzureCredential::ApiKey(_) => f.write_str("ApiKey([REDACTED])"),
            AzureCredential::Bearer(_) => f.write_str("Bearer([REDACTED])"),
        }
    }
}

/// Azure OpenAI API client.
pub struct AzureOpenAIClient {
    client: Client,
    endpoint: String,
    api_version: String,
    credential: AzureCredential,
    limiter: Arc<Semaphore>,
}

impl AzureOpenAIClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `endpoint` - Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    /// * `api_version` - REST API version query parameter
    /// * `credential` - Key or bearer token
    /// * `timeout` - Bound on each request
    pub fn new(
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
        credential: AzureCredential,
        timeout: Duration,
    ) -> FoundryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client".to_string(),
                value: String::new(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            credential,
            limiter: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT)),
        })
    }

    /// Build from the inference section of the process configuration.
    pub fn from_config(config: &InferenceConfig, timeout: Duration) -> FoundryResult<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| FoundryError::missing_config("AZURE_OPENAI_ENDPOINT"))?;
        let credential = match (&config.api_key, &config.bearer_token) {
            (Some(key), _) => AzureCredential::ApiKey(key.clone()),
            (None, Some(token)) => AzureCredential::Bearer(token.clone()),
            (None, None) => return Err(FoundryError::missing_config("AZURE_OPENAI_API_KEY")),
        };
        Self::new(endpoint, config.api_version.clone(), credential, timeout)
    }

    /// URL of `operation` on a deployment.
    pub fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, deployment, operation, self.api_version
        )
    }

    /// POST a JSON body to a deployment operation and decode the reply.
    pub async fn post<Req: Serialize, Res: DeserializeOwned>(
        &self,
        deployment: &str,
        operation: &str,
        body: &Req,
    ) -> FoundryResult<Res> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| FoundryError::transient(SERVICE, format!("limiter closed: {}", e)))?;

        let url = self.deployment_url(deployment, operation);
        debug!(deployment, operation, "Calling inference endpoint");

        let request = self.client.post(&url).json(body);
        let request = match &self.credential {
            AzureCredential::ApiKey(key) => request.header("api-key", key),
            AzureCredential::Bearer(token) => request.bearer_auth(token),
        };

        let response = request.send().await.map_err(send_error)?;
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| FoundryError::invalid_response(SERVICE, format!("Failed to parse response: {}", e)))
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(FoundryError::from_http_status(
                SERVICE,
                status.as_u16(),
                ApiError::message_from(&body),
            ))
        }
    }
}

fn send_error(e: reqwest::Error) -> FoundryError {
    if e.is_timeout() {
        FoundryError::transient(SERVICE, format!("request timed out: {}", e))
    } else {
        FoundryError::transient(SERVICE, format!("HTTP request failed: {}", e))
    }
}

impl std::fmt::Debug for AzureOpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAIClient")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("credential", &self.credential)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn inference(api_key: Option<&str>, token: Option<&str>) -> InferenceConfig {
        InferenceConfig {
            endpoint: Some("https://res.openai.azure.com/".to_string()),
            api_key: api_key.map(str::to_string),
            bearer_token: token.map(str::to_string),
            api_version: "2024-10-21".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            completion_model: None,
        }
    }

    #[test]
    fn test_deployment_url() {
        let client =
            AzureOpenAIClient::from_config(&inference(Some("k"), None), Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.deployment_url("text-embedding-3-small", "embeddings"),
            "https://res.openai.azure.com/openai/deployments/text-embedding-3-small/embeddings?api-version=2024-10-21"
        );
    }

    #[test]
    fn test_api_key_preferred_over_bearer() {
        let client = AzureOpenAIClient::from_config(
            &inference(Some("key"), Some("tok")),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.credential, AzureCredential::ApiKey("key".to_string()));

        let client =
            AzureOpenAIClient::from_config(&inference(None, Some("tok")), Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.credential, AzureCredential::Bearer("tok".to_string()));
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let err = AzureOpenAIClient::from_config(&inference(None, None), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, FoundryError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_credential() {
        let client =
            AzureOpenAIClient::from_config(&inference(Some("sk-secret"), None), Duration::from_secs(5))
                .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_error_body_message_extraction() {
        let body = r#"{"error":{"code":"DeploymentNotFound","message":"The deployment does not exist"}}"#;
        assert_eq!(ApiError::message_from(body), "The deployment does not exist");
        assert_eq!(ApiError::message_from("gateway down"), "gateway down");
    }
}
