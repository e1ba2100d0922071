//! REST client for the Azure AI Foundry Agents service.

use crate::platform::{AgentInfo, AgentPlatform, NativeContent, NativeMessage, NativeOutput, NativeRun};
use async_trait::async_trait;
use foundry_core::{AgentPlatformConfig, ConfigError, FoundryError, FoundryResult, RunRef};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "agents";
/// Upper bound on catalogue pages fetched by one `list_agents` call.
const MAX_LIST_PAGES: usize = 50;

/// Agents REST client bound to one project endpoint.
pub struct FoundryAgentsClient {
    client: Client,
    endpoint: String,
    api_version: String,
    token: Option<String>,
}

impl FoundryAgentsClient {
    pub fn new(config: &AgentPlatformConfig, timeout: Duration) -> FoundryResult<Self> {
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
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!(
            "{}/{}{}api-version={}",
            self.endpoint, path, separator, self.api_version
        )
    }

    async fn get<Res: DeserializeOwned>(&self, path: &str) -> FoundryResult<Res> {
        debug!(path, "GET agents service");
        self.execute(self.client.get(self.url(path))).await
    }

    async fn post<Req: Serialize + Sync, Res: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> FoundryResult<Res> {
        debug!(path, "POST agents service");
        self.execute(self.client.post(self.url(path)).json(body)).await
    }

    async fn execute<Res: DeserializeOwned>(&self, request: RequestBuilder) -> FoundryResult<Res> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(send_error)?;
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| {
                FoundryError::invalid_response(SERVICE, format!("Failed to parse response: {}", e))
            })
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(FoundryError::from_http_status(
                SERVICE,
                status.as_u16(),
                error_message(&text),
            ))
        }
    }
}

/// Ids are spliced into the request path; anything `RunRef::parse` would
/// reject never reaches the wire.
fn path_safe(run: &RunRef) -> FoundryResult<RunRef> {
    RunRef::parse(&run.invocation_id())
}

fn send_error(e: reqwest::Error) -> FoundryError {
    if e.is_timeout() {
        FoundryError::transient(SERVICE, format!("request timed out: {}", e))
    } else {
        FoundryError::transient(SERVICE, format!("HTTP request failed: {}", e))
    }
}

fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }
    serde_json::from_str::<Envelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListPage<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireAgent {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tools: Vec<WireTool>,
    #[serde(default)]
    metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
}

impl From<WireAgent> for AgentInfo {
    fn from(agent: WireAgent) -> Self {
        AgentInfo {
            id: agent.id,
            name: agent.name,
            model: agent.model,
            description: agent.description,
            tools: agent.tools.into_iter().map(|t| t.tool_type).collect(),
            metadata: agent.metadata.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateThreadAndRun<'a> {
    assistant_id: &'a str,
    thread: ThreadOptions<'a>,
}

#[derive(Debug, Serialize)]
struct ThreadOptions<'a> {
    messages: Vec<MessageOptions<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageOptions<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireRun {
    id: String,
    thread_id: String,
    status: String,
    #[serde(default)]
    last_error: Option<WireRunError>,
    #[serde(default)]
    started_at: Option<i64>,
    #[serde(default)]
    completed_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireRunError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<WireRun> for NativeRun {
    fn from(run: WireRun) -> Self {
        let last_error = run
            .last_error
            .and_then(|e| e.message.or(e.code))
            .filter(|m| !m.is_empty());
        NativeRun {
            status: run.status,
            last_error,
            started_at: run.started_at,
            completed_at: run.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Vec<WireContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text { text: WireText },
    ImageFile { image_file: WireFileRef },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct WireText {
    value: String,
    #[serde(default)]
    annotations: Vec<WireAnnotation>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireAnnotation {
    FileCitation { file_citation: WireFileRef },
    FilePath { file_path: WireFileRef },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct WireFileRef {
    file_id: String,
}

impl From<WireMessage> for NativeMessage {
    fn from(message: WireMessage) -> Self {
        let content = message
            .content
            .into_iter()
            .filter_map(|part| match part {
                WireContent::Text { text } => Some(NativeContent::Text {
                    value: text.value,
                    file_ids: text
                        .annotations
                        .into_iter()
                        .filter_map(|a| match a {
                            WireAnnotation::FileCitation { file_citation } => {
                                Some(file_citation.file_id)
                            }
                            WireAnnotation::FilePath { file_path } => Some(file_path.file_id),
                            WireAnnotation::Unsupported => None,
                        })
                        .collect(),
                }),
                WireContent::ImageFile { image_file } => Some(NativeContent::ImageFile {
                    file_id: image_file.file_id,
                }),
                WireContent::Unsupported => None,
            })
            .collect();
        NativeMessage {
            role: message.role,
            content,
        }
    }
}

// ============================================================================
// PLATFORM IMPL
// ============================================================================

#[async_trait]
impl AgentPlatform for FoundryAgentsClient {
    async fn list_agents(&self) -> FoundryResult<Vec<AgentInfo>> {
        let mut agents = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let path = match &after {
                Some(cursor) => format!("assistants?limit=100&after={}", cursor),
                None => "assistants?limit=100".to_string(),
            };
            let page: ListPage<WireAgent> = self.get(&path).await?;
            agents.extend(page.data.into_iter().map(AgentInfo::from));
            match (page.has_more, page.last_id) {
                (true, Some(last)) => after = Some(last),
                _ => break,
            }
        }

        Ok(agents)
    }

    async fn submit(&self, agent_id: &str, content: &str) -> FoundryResult<RunRef> {
        let body = CreateThreadAndRun {
            assistant_id: agent_id,
            thread: ThreadOptions {
                messages: vec![MessageOptions {
                    role: "user",
                    content,
                }],
            },
        };
        let run: WireRun = self.post("threads/runs", &body).await?;
        Ok(RunRef::new(run.thread_id, run.id))
    }

    async fn fetch_status(&self, run: &RunRef) -> FoundryResult<NativeRun> {
        let run = path_safe(run)?;
        let path = format!("threads/{}/runs/{}", run.thread_id, run.run_id);
        let wire: WireRun = self.get(&path).await?;
        Ok(wire.into())
    }

    async fn fetch_output(&self, run: &RunRef) -> FoundryResult<NativeOutput> {
        let run = path_safe(run)?;
        let path = format!("threads/{}/messages?order=desc", run.thread_id);
        let page: ListPage<WireMessage> = self.get(&path).await?;
        Ok(NativeOutput {
            messages: page.data.into_iter().map(NativeMessage::from).collect(),
        })
    }
}

impl std::fmt::Debug for FoundryAgentsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoundryAgentsClient")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> FoundryAgentsClient {
        FoundryAgentsClient::new(
            &AgentPlatformConfig {
                endpoint: "https://res.services.ai.azure.com/api/projects/p/".to_string(),
                token: Some("secret".to_string()),
                api_version: "v1".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_url_appends_api_version() {
        let c = client();
        assert_eq!(
            c.url("threads/runs"),
            "https://res.services.ai.azure.com/api/projects/p/threads/runs?api-version=v1"
        );
        assert_eq!(
            c.url("threads/t1/messages?order=desc"),
            "https://res.services.ai.azure.com/api/projects/p/threads/t1/messages?order=desc&api-version=v1"
        );
    }

    #[tokio::test]
    async fn test_ids_with_path_characters_never_reach_the_wire() {
        let c = client();
        let escaping = RunRef::new("a/../assistants", "r");
        let err = c.fetch_status(&escaping).await.unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput { .. }));

        let query = RunRef::new("t?x=1", "r");
        let err = c.fetch_output(&query).await.unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput { .. }));
    }

    #[test]
    fn test_submit_body_shape() {
        let body = CreateThreadAndRun {
            assistant_id: "asst_1",
            thread: ThreadOptions {
                messages: vec![MessageOptions {
                    role: "user",
                    content: "do it",
                }],
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"assistant_id": "asst_1", "thread": {"messages": [{"role": "user", "content": "do it"}]}})
        );
    }

    #[test]
    fn test_agent_mapping() {
        let wire: WireAgent = serde_json::from_value(json!({
            "id": "asst_1", "object": "assistant", "name": "CaseStudyAgent", "model": "gpt-4o",
            "description": null, "tools": [{"type": "code_interpreter"}], "metadata": {"team": "x"}
        }))
        .unwrap();
        let agent = AgentInfo::from(wire);
        assert_eq!(agent.name.as_deref(), Some("CaseStudyAgent"));
        assert_eq!(agent.tools, vec!["code_interpreter".to_string()]);
        assert_eq!(agent.metadata.get("team").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_run_mapping_prefers_error_message() {
        let wire: WireRun = serde_json::from_value(json!({
            "id": "run_1", "thread_id": "thread_1", "status": "failed",
            "last_error": {"code": "rate_limit_exceeded", "message": "Rate limit reached"}
        }))
        .unwrap();
        let native = NativeRun::from(wire);
        assert_eq!(native.status, "failed");
        assert_eq!(native.last_error.as_deref(), Some("Rate limit reached"));

        let wire: WireRun = serde_json::from_value(json!({
            "id": "run_1", "thread_id": "thread_1", "status": "failed",
            "last_error": {"code": "server_error", "message": ""}
        }))
        .unwrap();
        assert_eq!(NativeRun::from(wire).last_error, None);
    }

    #[test]
    fn test_message_mapping_keeps_text_images_and_annotations() {
        let wire: WireMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "See chart", "annotations": [
                    {"type": "file_path", "text": "sandbox:/a.csv", "file_path": {"file_id": "file_a"}},
                    {"type": "url_citation", "url_citation": {"url": "https://x"}}
                ]}},
                {"type": "image_file", "image_file": {"file_id": "file_img"}},
                {"type": "audio", "audio": {}}
            ]
        }))
        .unwrap();
        let message = NativeMessage::from(wire);
        assert_eq!(
            message.content,
            vec![
                NativeContent::Text {
                    value: "See chart".to_string(),
                    file_ids: vec!["file_a".to_string()]
                },
                NativeContent::ImageFile {
                    file_id: "file_img".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"code":"NotFound","message":"No run found"}}"#),
            "No run found"
        );
        assert_eq!(error_message("plain"), "plain");
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("secret"));
    }
}
