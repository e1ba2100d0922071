//! Choice between deployed agents and direct completion for one run.

use foundry_agents::{AgentInfo, InvocationService};
use foundry_core::{FoundryConfig, DEFAULT_ARCHITECTURE_AGENT, DEFAULT_CASE_STUDY_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Names of the agents that serve the two extraction steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentNames {
    pub case_study: String,
    pub architecture: String,
}

impl Default for AgentNames {
    fn default() -> Self {
        Self {
            case_study: DEFAULT_CASE_STUDY_AGENT.to_string(),
            architecture: DEFAULT_ARCHITECTURE_AGENT.to_string(),
        }
    }
}

impl AgentNames {
    pub fn from_config(config: &FoundryConfig) -> Self {
        Self {
            case_study: config.case_study_agent_name.clone(),
            architecture: config.architecture_agent_name.clone(),
        }
    }
}

/// How every inference step of a run is served.
///
/// Chosen once before the first step; a run never mixes the two.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceStrategy {
    Agent {
        case_study: AgentInfo,
        architecture: AgentInfo,
    },
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Agent,
    Completion,
}

impl InferenceStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            InferenceStrategy::Agent { .. } => StrategyKind::Agent,
            InferenceStrategy::Completion => StrategyKind::Completion,
        }
    }

    /// Probe the agent catalogue once and decide.
    ///
    /// `Agent` requires a reachable catalogue listing both named agents.
    /// Every other outcome, including a failed probe, selects `Completion`.
    pub async fn select(invocations: Option<&InvocationService>, names: &AgentNames) -> Self {
        let Some(service) = invocations else {
            info!("No agent platform configured, using direct completion");
            return InferenceStrategy::Completion;
        };

        let agents = match service.list_agents().await {
            Ok(agents) => agents,
            Err(e) => {
                warn!(error = %e, "Agent catalogue probe failed, falling back to direct completion");
                return InferenceStrategy::Completion;
            }
        };

        let find = |name: &str| {
            agents
                .iter()
                .find(|a| a.name.as_deref() == Some(name))
                .cloned()
        };
        match (find(&names.case_study), find(&names.architecture)) {
            (Some(case_study), Some(architecture)) => {
                info!(
                    case_study_agent = %case_study.id,
                    architecture_agent = %architecture.id,
                    "Using deployed agents"
                );
                InferenceStrategy::Agent {
                    case_study,
                    architecture,
                }
            }
            (case_study, architecture) => {
                warn!(
                    case_study_found = case_study.is_some(),
                    architecture_found = architecture.is_some(),
                    "Extraction agents not deployed, falling back to direct completion"
                );
                InferenceStrategy::Completion
            }
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StrategyKind::Agent => "agent",
            StrategyKind::Completion => "completion",
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
