//! Scripted in-process agent platform for tests.

use crate::platform::{AgentInfo, AgentPlatform, NativeMessage, NativeOutput, NativeRun};
use async_trait::async_trait;
use foundry_core::{FoundryError, FoundryResult, RunRef};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What a run of one agent does: the native statuses it reports on
/// successive polls, then its output.
#[derive(Debug, Clone, PartialEq)]
pub struct RunScript {
    statuses: Vec<String>,
    last_error: Option<String>,
    output: NativeOutput,
}

impl RunScript {
    /// Report `statuses` in order; the last one repeats forever.
    pub fn statuses(statuses: &[&str]) -> Self {
        Self {
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            last_error: None,
            output: NativeOutput::default(),
        }
    }

    /// queued, in_progress, completed with one assistant reply.
    pub fn completes_with(reply: impl Into<String>) -> Self {
        Self::statuses(&["queued", "in_progress", "completed"]).with_reply(reply)
    }

    /// queued, then failed with `message`.
    pub fn fails(message: impl Into<String>) -> Self {
        let mut script = Self::statuses(&["queued", "failed"]);
        script.last_error = Some(message.into());
        script
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.output = NativeOutput {
            messages: vec![NativeMessage::assistant_text(reply)],
        };
        self
    }

    pub fn with_output(mut self, output: NativeOutput) -> Self {
        self.output = output;
        self
    }
}

impl Default for RunScript {
    fn default() -> Self {
        Self::completes_with("done")
    }
}

#[derive(Debug)]
struct MockRun {
    pending: VecDeque<String>,
    current: String,
    last_error: Option<String>,
    output: NativeOutput,
}

#[derive(Debug, Default)]
struct MockState {
    agents: Vec<AgentInfo>,
    scripts: HashMap<String, RunScript>,
    runs: HashMap<RunRef, MockRun>,
    submissions: Vec<(String, String)>,
    unreachable: bool,
}

/// Mock agent platform.
///
/// Agents must be registered before they can be submitted to. Each
/// submission starts a run following the agent's [`RunScript`]; each
/// `fetch_status` advances the run by one scripted status.
#[derive(Debug, Default)]
pub struct MockAgentPlatform {
    state: Mutex<MockState>,
    next_id: AtomicUsize,
    status_fetches: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MockAgentPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> FoundryResult<std::sync::MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| FoundryError::transient("mock agents", "state lock poisoned"))
    }

    pub fn add_agent(&self, id: &str, name: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.agents.push(AgentInfo::new(id, name));
        }
    }

    /// Set the script used by future runs of `agent_id`.
    pub fn script(&self, agent_id: &str, script: RunScript) {
        if let Ok(mut state) = self.state.lock() {
            state.scripts.insert(agent_id.to_string(), script);
        }
    }

    /// Make every call fail with a transient error.
    pub fn set_unreachable(&self, unreachable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unreachable = unreachable;
        }
    }

    /// `(agent_id, content)` of every submission, in order.
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .map(|s| s.submissions.clone())
            .unwrap_or_default()
    }

    pub fn status_fetch_count(&self) -> usize {
        self.status_fetches.load(Ordering::SeqCst)
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(state: &MockState) -> FoundryResult<()> {
        if state.unreachable {
            return Err(FoundryError::transient("agents", "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl AgentPlatform for MockAgentPlatform {
    async fn list_agents(&self) -> FoundryResult<Vec<AgentInfo>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.lock()?;
        Self::check_reachable(&state)?;
        Ok(state.agents.clone())
    }

    async fn submit(&self, agent_id: &str, content: &str) -> FoundryResult<RunRef> {
        let mut state = self.lock()?;
        Self::check_reachable(&state)?;
        if !state.agents.iter().any(|a| a.id == agent_id) {
            return Err(FoundryError::not_found(format!("agent {}", agent_id)));
        }

        let script = state.scripts.get(agent_id).cloned().unwrap_or_default();
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let run = RunRef::new(format!("thread_{}", n), format!("run_{}", n));

        let pending: VecDeque<String> = script.statuses.into();
        state.runs.insert(
            run.clone(),
            MockRun {
                pending,
                current: "queued".to_string(),
                last_error: script.last_error,
                output: script.output,
            },
        );
        state
            .submissions
            .push((agent_id.to_string(), content.to_string()));
        Ok(run)
    }

    async fn fetch_status(&self, run: &RunRef) -> FoundryResult<NativeRun> {
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock()?;
        Self::check_reachable(&state)?;
        let mock = state
            .runs
            .get_mut(run)
            .ok_or_else(|| FoundryError::not_found(format!("run {}", run.invocation_id())))?;

        if let Some(next) = mock.pending.pop_front() {
            mock.current = next;
        }
        Ok(NativeRun {
            status: mock.current.clone(),
            last_error: mock.last_error.clone(),
            started_at: None,
            completed_at: None,
        })
    }

    async fn fetch_output(&self, run: &RunRef) -> FoundryResult<NativeOutput> {
        let state = self.lock()?;
        Self::check_reachable(&state)?;
        state
            .runs
            .get(run)
            .map(|r| r.output.clone())
            .ok_or_else(|| FoundryError::not_found(format!("run {}", run.invocation_id())))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_advances_one_status_per_poll_and_sticks() {
        let platform = MockAgentPlatform::new();
        platform.add_agent("a", "A");
        platform.script("a", RunScript::completes_with("hi"));
        let run = platform.submit("a", "task").await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(platform.fetch_status(&run).await.unwrap().status);
        }
        assert_eq!(
            seen,
            vec!["queued", "in_progress", "completed", "completed", "completed"]
        );
        assert_eq!(platform.status_fetch_count(), 5);
    }

    #[tokio::test]
    async fn test_submit_to_unknown_agent_is_not_found() {
        let platform = MockAgentPlatform::new();
        let err = platform.submit("ghost", "task").await.unwrap_err();
        assert!(matches!(err, FoundryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_platform_is_transient() {
        let platform = MockAgentPlatform::new();
        platform.set_unreachable(true);
        assert!(platform.list_agents().await.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let platform = MockAgentPlatform::new();
        platform.add_agent("a", "A");
        let first = platform.submit("a", "one").await.unwrap();
        let second = platform.submit("a", "two").await.unwrap();
        assert_ne!(first, second);

        platform.fetch_status(&first).await.unwrap();
        platform.fetch_status(&first).await.unwrap();
        assert_eq!(platform.fetch_status(&second).await.unwrap().status, "queued");
        assert_eq!(platform.submissions().len(), 2);
    }
}
