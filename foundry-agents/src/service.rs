//! Agent catalogue, submission and the full invocation lifecycle.

use crate::client::FoundryAgentsClient;
use crate::extractor::ResultExtractor;
use crate::platform::{AgentInfo, AgentPlatform};
use crate::poller::StatusPoller;
use foundry_core::{
    FoundryConfig, FoundryError, FoundryResult, InvocationHandle, InvocationResult,
    InvocationStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Entry point for everything the agent tools do.
#[derive(Clone)]
pub struct InvocationService {
    platform: Arc<dyn AgentPlatform>,
    poller: StatusPoller,
    extractor: ResultExtractor,
}

impl InvocationService {
    pub fn new(platform: Arc<dyn AgentPlatform>, poll_interval: Duration) -> Self {
        Self {
            poller: StatusPoller::new(platform.clone(), poll_interval),
            extractor: ResultExtractor::new(platform.clone()),
            platform,
        }
    }

    /// Build on the REST client. Fails if no project endpoint is configured.
    pub fn from_config(config: &FoundryConfig) -> FoundryResult<Self> {
        let agents = config
            .agents
            .as_ref()
            .ok_or_else(|| FoundryError::missing_config("AZURE_AI_PROJECT_ENDPOINT"))?;
        let client = FoundryAgentsClient::new(agents, config.request_timeout)?;
        Ok(Self::new(Arc::new(client), config.poll_interval))
    }

    pub async fn list_agents(&self) -> FoundryResult<Vec<AgentInfo>> {
        self.platform.list_agents().await
    }

    /// First agent whose name is exactly `name`.
    pub async fn find_agent_by_name(&self, name: &str) -> FoundryResult<Option<AgentInfo>> {
        let agents = self.platform.list_agents().await?;
        Ok(agents.into_iter().find(|a| a.name.as_deref() == Some(name)))
    }

    /// Submit `task` to `agent_id`, appending `file_context` when present.
    pub async fn submit(
        &self,
        agent_id: &str,
        task: &str,
        file_context: Option<&str>,
    ) -> FoundryResult<InvocationHandle> {
        if agent_id.trim().is_empty() {
            return Err(FoundryError::invalid_input("agent_id", "must not be empty"));
        }
        if task.trim().is_empty() {
            return Err(FoundryError::invalid_input("task", "must not be empty"));
        }

        let content = submission_content(task, file_context);
        let run = self.platform.submit(agent_id, &content).await?;
        let handle = InvocationHandle::new(agent_id, &run);
        info!(invocation_id = %handle.invocation_id, agent_id, "Submitted invocation");
        Ok(handle)
    }

    pub async fn get_status(&self, handle: &InvocationHandle) -> FoundryResult<InvocationStatus> {
        self.poller.get_status(handle).await
    }

    pub async fn await_terminal(
        &self,
        handle: &InvocationHandle,
        timeout: Duration,
    ) -> FoundryResult<InvocationStatus> {
        self.poller.await_terminal(handle, timeout).await
    }

    pub async fn get_result(&self, handle: &InvocationHandle) -> FoundryResult<InvocationResult> {
        self.extractor.get_result(handle).await
    }

    /// Submit, wait for a terminal status, then read the result.
    pub async fn invoke_and_wait(
        &self,
        agent_id: &str,
        message: &str,
        timeout: Duration,
    ) -> FoundryResult<InvocationResult> {
        let handle = self.submit(agent_id, message, None).await?;
        let status = self.await_terminal(&handle, timeout).await?;
        info!(invocation_id = %handle.invocation_id, status = %status, "Invocation finished");
        self.get_result(&handle).await
    }
}

impl std::fmt::Debug for InvocationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationService")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

fn submission_content(task: &str, file_context: Option<&str>) -> String {
    match file_context.filter(|c| !c.trim().is_empty()) {
        Some(context) => format!("{task}\n\nAdditional context:\n{context}"),
        None => task.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAgentPlatform, RunScript};

    fn service_with(platform: &Arc<MockAgentPlatform>) -> InvocationService {
        InvocationService::new(platform.clone(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_find_agent_by_name_takes_first_exact_match() {
        let platform = Arc::new(MockAgentPlatform::new());
        platform.add_agent("asst_1", "CaseStudyAgent");
        platform.add_agent("asst_2", "casestudyagent");
        platform.add_agent("asst_3", "CaseStudyAgent");
        let service = service_with(&platform);

        let found = service.find_agent_by_name("CaseStudyAgent").await.unwrap();
        assert_eq!(found.unwrap().id, "asst_1");
        assert!(service.find_agent_by_name("Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_inputs_before_remote_call() {
        let platform = Arc::new(MockAgentPlatform::new());
        platform.add_agent("asst_1", "A");
        let service = service_with(&platform);

        let err = service.submit("", "task", None).await.unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput { ref field, .. } if field == "agent_id"));
        let err = service.submit("asst_1", "  ", None).await.unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput { ref field, .. } if field == "task"));
        assert!(platform.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_submit_appends_file_context() {
        let platform = Arc::new(MockAgentPlatform::new());
        platform.add_agent("asst_1", "A");
        let service = service_with(&platform);

        let handle = service
            .submit("asst_1", "Summarize", Some("notes.md contents"))
            .await
            .unwrap();
        service.submit("asst_1", "Plain", Some("")).await.unwrap();

        assert_eq!(handle.agent_id, "asst_1");
        assert!(handle.invocation_id.contains("::"));
        let submissions = platform.submissions();
        assert_eq!(
            submissions[0].1,
            "Summarize\n\nAdditional context:\nnotes.md contents"
        );
        assert_eq!(submissions[1].1, "Plain");
    }

    #[tokio::test]
    async fn test_lifecycle_end_to_end() {
        let platform = Arc::new(MockAgentPlatform::new());
        platform.add_agent("asst_1", "Writer");
        platform.script("asst_1", RunScript::completes_with("Final report"));
        let service = service_with(&platform);

        let handle = service.submit("asst_1", "Write it", None).await.unwrap();
        let first = service.get_status(&handle).await.unwrap();
        assert!(matches!(
            first,
            InvocationStatus::Queued | InvocationStatus::InProgress
        ));
        assert!(service.get_result(&handle).await.unwrap_err().is_retryable());

        let status = service
            .await_terminal(&handle, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(status, InvocationStatus::Completed);
        let result = service.get_result(&handle).await.unwrap();
        assert_eq!(result.text, "Final report");
    }

    #[tokio::test]
    async fn test_invoke_and_wait_surfaces_failure() {
        let platform = Arc::new(MockAgentPlatform::new());
        platform.add_agent("asst_1", "Writer");
        platform.script("asst_1", RunScript::fails("Model overloaded"));
        let err = service_with(&platform)
            .invoke_and_wait("asst_1", "go", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Model overloaded"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_config_requires_project_endpoint() {
        let err = InvocationService::from_config(&FoundryConfig::default()).unwrap_err();
        assert!(matches!(err, FoundryError::Config(_)));
    }
}
