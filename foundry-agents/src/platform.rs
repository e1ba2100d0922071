//! The remote agent platform seen as a four-operation collaborator.

use async_trait::async_trait;
use foundry_core::{FoundryResult, RunRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CATALOGUE
// ============================================================================

/// A deployed agent as listed by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Tool types the agent can call (e.g. `code_interpreter`).
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AgentInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            model: None,
            description: None,
            tools: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

// ============================================================================
// NATIVE RUN STATE AND OUTPUT
// ============================================================================

/// Run state in the platform's own vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeRun {
    pub status: String,
    /// Platform-reported failure message, if any.
    pub last_error: Option<String>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl NativeRun {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }
}

/// One content part of a thread message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeContent {
    /// Text plus the file ids its annotations cite, in order.
    Text { value: String, file_ids: Vec<String> },
    ImageFile { file_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMessage {
    pub role: String,
    pub content: Vec<NativeContent>,
}

impl NativeMessage {
    pub fn assistant_text(value: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: vec![NativeContent::Text {
                value: value.into(),
                file_ids: Vec::new(),
            }],
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role.eq_ignore_ascii_case("assistant")
    }
}

/// Thread messages, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeOutput {
    pub messages: Vec<NativeMessage>,
}

// ============================================================================
// PLATFORM TRAIT
// ============================================================================

/// Remote agent platform client.
///
/// The status poller and result extractor depend only on `fetch_status` and
/// `fetch_output`; `list_agents` backs catalogue lookups and availability
/// probes.
#[async_trait]
pub trait AgentPlatform: Send + Sync {
    async fn list_agents(&self) -> FoundryResult<Vec<AgentInfo>>;

    /// Start a run of `agent_id` on a new thread holding one user message.
    async fn submit(&self, agent_id: &str, content: &str) -> FoundryResult<RunRef>;

    /// Fails with `NotFound` if the run is unknown.
    async fn fetch_status(&self, run: &RunRef) -> FoundryResult<NativeRun>;

    async fn fetch_output(&self, run: &RunRef) -> FoundryResult<NativeOutput>;
}
