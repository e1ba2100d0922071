//! The ingest workflow: fetch, extract, embed, persist.

use crate::extract::{
    architecture_message, case_study_message, parse_architecture, parse_case_study,
    ARCHITECTURE_INSTRUCTIONS, CASE_STUDY_INSTRUCTIONS,
};
use crate::fetch::{parse_source_url, ContentFetcher};
use crate::strategy::{AgentNames, InferenceStrategy, StrategyKind};
use foundry_agents::InvocationService;
use foundry_core::{
    ContextEmbedding, EntryDraft, EntryType, FoundryConfig, FoundryError, FoundryResult,
    ProjectLogEntry, DEFAULT_AGENT_TIMEOUT_SECS,
};
use foundry_llm::{CompletionProvider, Prompt};
use foundry_storage::ProjectLogIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, Instrument};
use url::Url;

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// The persisted entry, without its vector.
    pub entry: ProjectLogEntry,
    pub strategy: StrategyKind,
    pub fetched_chars: usize,
    pub components: Vec<String>,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractionStep {
    CaseStudy,
    Architecture,
}

impl ExtractionStep {
    fn as_str(&self) -> &'static str {
        match self {
            ExtractionStep::CaseStudy => "case_study",
            ExtractionStep::Architecture => "architecture",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            ExtractionStep::CaseStudy => CASE_STUDY_INSTRUCTIONS,
            ExtractionStep::Architecture => ARCHITECTURE_INSTRUCTIONS,
        }
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Turns a customer-story URL into one persisted project-log entry.
///
/// Stages run strictly in order and any failure aborts the run with the
/// stage's own error. Nothing is written unless every stage succeeded.
pub struct IngestPipeline {
    fetcher: Arc<dyn ContentFetcher>,
    invocations: Option<InvocationService>,
    completion: Option<Arc<dyn CompletionProvider>>,
    index: Arc<ProjectLogIndex>,
    agent_names: AgentNames,
    agent_timeout: Duration,
}

impl IngestPipeline {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, index: Arc<ProjectLogIndex>) -> Self {
        Self {
            fetcher,
            invocations: None,
            completion: None,
            index,
            agent_names: AgentNames::default(),
            agent_timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
        }
    }

    pub fn with_agents(mut self, invocations: InvocationService) -> Self {
        self.invocations = Some(invocations);
        self
    }

    pub fn with_completion(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(provider);
        self
    }

    pub fn with_agent_names(mut self, names: AgentNames) -> Self {
        self.agent_names = names;
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Apply agent names and the per-invocation bound from configuration.
    pub fn configured(self, config: &FoundryConfig) -> Self {
        self.with_agent_names(AgentNames::from_config(config))
            .with_agent_timeout(config.agent_timeout)
    }

    pub fn index(&self) -> &ProjectLogIndex {
        &self.index
    }

    /// Run every stage for `source_url` and persist the entry under `project_name`.
    ///
    /// # Errors
    /// - `InvalidInput` for a malformed URL, before anything is fetched
    /// - `Fetch` if the source cannot be retrieved or has no visible text
    /// - `Config` if direct completion is needed but no model is configured
    /// - `InvalidResponse` if an extraction answer has the wrong shape
    /// - any error of the invocation, embedding or index stage, unchanged
    pub async fn run(&self, source_url: &str, project_name: &str) -> FoundryResult<IngestReport> {
        let url = parse_source_url(source_url)?;
        let span = info_span!("ingest", url = %url, project = project_name);
        self.run_stages(url, project_name).instrument(span).await
    }

    async fn run_stages(&self, url: Url, project_name: &str) -> FoundryResult<IngestReport> {
        let text = self
            .fetcher
            .fetch(&url)
            .instrument(info_span!("stage", stage = "fetch"))
            .await?;
        if text.trim().is_empty() {
            return Err(FoundryError::Fetch {
                url: url.to_string(),
                reason: "page has no visible text".to_string(),
            });
        }
        let fetched_chars = text.chars().count();
        info!(stage = "fetch", chars = fetched_chars, "Fetched source");

        let strategy = InferenceStrategy::select(self.invocations.as_ref(), &self.agent_names)
            .instrument(info_span!("stage", stage = "select"))
            .await;
        if strategy == InferenceStrategy::Completion && self.completion.is_none() {
            return Err(FoundryError::missing_config("AZURE_OPENAI_COMPLETION_MODEL_NAME"));
        }

        let raw = self
            .infer(
                &strategy,
                ExtractionStep::CaseStudy,
                case_study_message(&text, url.as_str()),
            )
            .instrument(info_span!("stage", stage = "case_study"))
            .await?;
        let case = parse_case_study(&raw, url.as_str())?;
        info!(stage = "case_study", title = %case.title, tags = case.tags.len(), "Extracted case study");

        let raw = self
            .infer(
                &strategy,
                ExtractionStep::Architecture,
                architecture_message(&case),
            )
            .instrument(info_span!("stage", stage = "architecture"))
            .await?;
        let architecture = parse_architecture(&raw)?;
        info!(
            stage = "architecture",
            components = architecture.components.len(),
            "Extracted architecture"
        );

        let vector = self
            .index
            .embedder()
            .embed(&case.context)
            .instrument(info_span!("stage", stage = "embed"))
            .await?;

        let mut draft = EntryDraft::new(case.title, EntryType::Blog, case.context);
        draft.customer_name = case.customer_name;
        draft.short_summary = case.short_summary;
        draft.project_name = project_name.trim().to_string();
        draft.tags = case.tags;
        draft.reference_url = case.reference_url;
        draft.architecture = architecture.json;
        draft.embedding = Some(ContextEmbedding::for_context(&draft.context, vector));

        let entry = self
            .index
            .upsert(draft)
            .instrument(info_span!("stage", stage = "persist"))
            .await?;
        info!(stage = "persist", id = %entry.id, strategy = %strategy.kind(), "Ingest complete");

        Ok(IngestReport {
            entry: entry.without_vector(),
            strategy: strategy.kind(),
            fetched_chars,
            components: architecture.components,
            patterns: architecture.patterns,
        })
    }

    /// Serve one extraction step under the run's strategy.
    async fn infer(
        &self,
        strategy: &InferenceStrategy,
        step: ExtractionStep,
        message: String,
    ) -> FoundryResult<String> {
        match strategy {
            InferenceStrategy::Agent {
                case_study,
                architecture,
            } => {
                let agent = match step {
                    ExtractionStep::CaseStudy => case_study,
                    ExtractionStep::Architecture => architecture,
                };
                let service = self
                    .invocations
                    .as_ref()
                    .ok_or_else(|| FoundryError::missing_config("AZURE_AI_PROJECT_ENDPOINT"))?;
                let result = service
                    .invoke_and_wait(&agent.id, &message, self.agent_timeout)
                    .await?;
                Ok(result.text)
            }
            InferenceStrategy::Completion => {
                let provider = self.completion.as_ref().ok_or_else(|| {
                    FoundryError::missing_config("AZURE_OPENAI_COMPLETION_MODEL_NAME")
                })?;
                let prompt = Prompt::new(step.instructions(), message).json();
                debug!(step = step.as_str(), model = provider.model_id(), "Completion call");
                provider.complete(&prompt).await
            }
        }
    }
}

impl std::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("index", &self.index.name())
            .field("agents", &self.invocations.is_some())
            .field("completion", &self.completion.is_some())
            .field("agent_names", &self.agent_names)
            .field("agent_timeout", &self.agent_timeout)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
