//! Process configuration, read once at startup.

use crate::{ConfigError, FoundryResult, DEFAULT_INDEX_NAME};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_AGENTS_API_VERSION: &str = "v1";
pub const DEFAULT_SEARCH_API_VERSION: &str = "2024-07-01";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-10-21";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: i32 = 1536;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_EMBED_MAX_CHARS: usize = 24_000;
pub const DEFAULT_FETCH_MAX_CHARS: usize = 12_000;
pub const DEFAULT_CASE_STUDY_AGENT: &str = "CaseStudyAgent";
pub const DEFAULT_ARCHITECTURE_AGENT: &str = "ArchitectureAgent";

const REDACTED: &str = "[REDACTED]";

// ============================================================================
// LENGTH POLICY
// ============================================================================

/// What the embedder does with text longer than its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Keep the first `max_chars` characters.
    #[default]
    Truncate,
    /// Fail with `InputTooLarge`.
    Reject,
}

impl LengthPolicy {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            LengthPolicy::Truncate => "truncate",
            LengthPolicy::Reject => "reject",
        }
    }
}

impl FromStr for LengthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(LengthPolicy::Truncate),
            "reject" => Ok(LengthPolicy::Reject),
            other => Err(format!("unknown policy '{}', expected truncate or reject", other)),
        }
    }
}

// ============================================================================
// SERVICE SECTIONS
// ============================================================================

/// Agent platform (project) endpoint and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AgentPlatformConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub api_version: String,
}

impl fmt::Debug for AgentPlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentPlatformConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Search service endpoint, key and target index.
#[derive(Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub index_name: String,
    pub api_version: String,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("index_name", &self.index_name)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Inference endpoint used for embeddings and fallback completions.
#[derive(Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Bearer token used when no api key is configured.
    pub bearer_token: Option<String>,
    pub api_version: String,
    pub embedding_model: String,
    pub embedding_dimensions: i32,
    pub completion_model: Option<String>,
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| REDACTED))
            .field("api_version", &self.api_version)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("completion_model", &self.completion_model)
            .finish()
    }
}

// ============================================================================
// MASTER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundryConfig {
    /// Absent when no project endpoint is configured.
    pub agents: Option<AgentPlatformConfig>,
    /// Absent when no search endpoint is configured.
    pub search: Option<SearchConfig>,
    pub inference: InferenceConfig,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub agent_timeout: Duration,
    pub embed_max_chars: usize,
    pub embed_length_policy: LengthPolicy,
    pub fetch_max_chars: usize,
    pub case_study_agent_name: String,
    pub architecture_agent_name: String,
}

impl Default for FoundryConfig {
    fn default() -> Self {
        Self {
            agents: None,
            search: None,
            inference: InferenceConfig {
                endpoint: None,
                api_key: None,
                bearer_token: None,
                api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
                embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
                embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
                completion_model: None,
            },
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            agent_timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
            embed_max_chars: DEFAULT_EMBED_MAX_CHARS,
            embed_length_policy: LengthPolicy::Truncate,
            fetch_max_chars: DEFAULT_FETCH_MAX_CHARS,
            case_study_agent_name: DEFAULT_CASE_STUDY_AGENT.to_string(),
            architecture_agent_name: DEFAULT_ARCHITECTURE_AGENT.to_string(),
        }
    }
}

impl FoundryConfig {
    /// Read configuration from the process environment.
    ///
    /// # Environment Variables
    /// - `AZURE_AI_PROJECT_ENDPOINT`, `AZURE_AI_PROJECT_TOKEN`, `AZURE_AI_AGENTS_API_VERSION`
    /// - `AZURE_AI_SEARCH_ENDPOINT`, `AZURE_AI_SEARCH_API_KEY`,
    ///   `AZURE_AI_SEARCH_INDEX_NAME`, `AZURE_AI_SEARCH_API_VERSION`
    /// - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_API_VERSION`,
    ///   `AZURE_OPENAI_EMBEDDING_MODEL`, `AZURE_OPENAI_EMBEDDING_DIMENSIONS`,
    ///   `AZURE_OPENAI_COMPLETION_MODEL_NAME`
    /// - `FOUNDRY_REQUEST_TIMEOUT_SECS`, `FOUNDRY_POLL_INTERVAL_MS`,
    ///   `FOUNDRY_AGENT_TIMEOUT_SECS`, `FOUNDRY_EMBED_MAX_CHARS`,
    ///   `FOUNDRY_EMBED_LENGTH_POLICY`, `FOUNDRY_FETCH_MAX_CHARS`
    /// - `FOUNDRY_CASE_STUDY_AGENT_NAME`, `FOUNDRY_ARCHITECTURE_AGENT_NAME`
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for unparseable numbers or policies.
    pub fn from_env() -> FoundryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> FoundryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let project_endpoint = get("AZURE_AI_PROJECT_ENDPOINT");
        let project_token = get("AZURE_AI_PROJECT_TOKEN");

        let agents = project_endpoint.clone().map(|endpoint| AgentPlatformConfig {
            endpoint,
            token: project_token.clone(),
            api_version: get("AZURE_AI_AGENTS_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AGENTS_API_VERSION.to_string()),
        });

        let search = get("AZURE_AI_SEARCH_ENDPOINT").map(|endpoint| SearchConfig {
            endpoint,
            api_key: get("AZURE_AI_SEARCH_API_KEY"),
            index_name: get("AZURE_AI_SEARCH_INDEX_NAME")
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            api_version: get("AZURE_AI_SEARCH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
        });

        let embedding_dimensions: i32 = parse_or(
            &get,
            "AZURE_OPENAI_EMBEDDING_DIMENSIONS",
            defaults.inference.embedding_dimensions,
        )?;
        if embedding_dimensions <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "AZURE_OPENAI_EMBEDDING_DIMENSIONS".to_string(),
                value: embedding_dimensions.to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        let inference = InferenceConfig {
            endpoint: get("AZURE_OPENAI_ENDPOINT").or(project_endpoint),
            api_key: get("AZURE_OPENAI_API_KEY"),
            bearer_token: project_token,
            api_version: get("AZURE_OPENAI_API_VERSION")
                .unwrap_or(defaults.inference.api_version),
            embedding_model: get("AZURE_OPENAI_EMBEDDING_MODEL")
                .unwrap_or(defaults.inference.embedding_model),
            embedding_dimensions,
            completion_model: get("AZURE_OPENAI_COMPLETION_MODEL_NAME"),
        };

        let embed_length_policy = match get("FOUNDRY_EMBED_LENGTH_POLICY") {
            Some(raw) => raw
                .parse::<LengthPolicy>()
                .map_err(|reason| ConfigError::InvalidValue {
                    field: "FOUNDRY_EMBED_LENGTH_POLICY".to_string(),
                    value: raw.clone(),
                    reason,
                })?,
            None => defaults.embed_length_policy,
        };

        Ok(Self {
            agents,
            search,
            inference,
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "FOUNDRY_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            poll_interval: Duration::from_millis(parse_or(
                &get,
                "FOUNDRY_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            agent_timeout: Duration::from_secs(parse_or(
                &get,
                "FOUNDRY_AGENT_TIMEOUT_SECS",
                DEFAULT_AGENT_TIMEOUT_SECS,
            )?),
            embed_max_chars: parse_or(&get, "FOUNDRY_EMBED_MAX_CHARS", DEFAULT_EMBED_MAX_CHARS)?,
            embed_length_policy,
            fetch_max_chars: parse_or(&get, "FOUNDRY_FETCH_MAX_CHARS", DEFAULT_FETCH_MAX_CHARS)?,
            case_study_agent_name: get("FOUNDRY_CASE_STUDY_AGENT_NAME")
                .unwrap_or(defaults.case_study_agent_name),
            architecture_agent_name: get("FOUNDRY_ARCHITECTURE_AGENT_NAME")
                .unwrap_or(defaults.architecture_agent_name),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

// =============================================================================
// TESTS
// =============================================================================
