//! Shared application state for the tool router.

use std::sync::Arc;

use foundry_agents::InvocationService;
use foundry_core::{FoundryConfig, FoundryResult};
use foundry_llm::{
    AzureOpenAIClient, AzureOpenAICompletionProvider, AzureOpenAIEmbeddingProvider,
    CompletionProvider, DocumentEmbedder,
};
use foundry_pipeline::{HttpContentFetcher, IngestPipeline};
use foundry_storage::{AzureSearchClient, ProjectLogIndex};
use tracing::info;

/// Temperature for the extraction prompts.
const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Every component a tool can reach. Components whose endpoint is not
/// configured are absent; tools that need them fail with a config error.
#[derive(Clone)]
pub struct AppState {
    pub config: FoundryConfig,
    pub invocations: Option<InvocationService>,
    pub index: Option<Arc<ProjectLogIndex>>,
    pub pipeline: Option<Arc<IngestPipeline>>,
}

impl AppState {
    /// State with no components attached.
    pub fn new(config: FoundryConfig) -> Self {
        Self {
            config,
            invocations: None,
            index: None,
            pipeline: None,
        }
    }

    pub fn with_agents(mut self, invocations: InvocationService) -> Self {
        self.invocations = Some(invocations);
        self
    }

    pub fn with_index(mut self, index: Arc<ProjectLogIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_pipeline(mut self, pipeline: IngestPipeline) -> Self {
        self.pipeline = Some(Arc::new(pipeline));
        self
    }

    /// Build the REST clients for every configured endpoint.
    ///
    /// Credentials are read here once and injected into each client.
    ///
    /// # Errors
    /// `Config` when the search endpoint is set but inference credentials
    /// are not.
    pub fn from_config(config: FoundryConfig) -> FoundryResult<Self> {
        let mut state = Self::new(config.clone());

        if config.agents.is_some() {
            state = state.with_agents(InvocationService::from_config(&config)?);
        }

        let Some(search) = config.search.as_ref() else {
            info!("No search endpoint configured; index and workflow tools are disabled");
            return Ok(state);
        };

        let client = Arc::new(AzureOpenAIClient::from_config(
            &config.inference,
            config.request_timeout,
        )?);
        let embeddings = AzureOpenAIEmbeddingProvider::new(
            client.clone(),
            config.inference.embedding_model.clone(),
            config.inference.embedding_dimensions,
        );
        let embedder = DocumentEmbedder::from_config(Arc::new(embeddings), &config);
        let store = AzureSearchClient::new(search, config.request_timeout)?;
        let index = Arc::new(ProjectLogIndex::new(
            Arc::new(store),
            embedder,
            search.index_name.clone(),
        ));

        let mut pipeline = IngestPipeline::new(
            Arc::new(HttpContentFetcher::from_config(&config)?),
            index.clone(),
        );
        if let Some(invocations) = state.invocations.clone() {
            pipeline = pipeline.with_agents(invocations);
        }
        if let Some(model) = config.inference.completion_model.as_ref() {
            let completion: Arc<dyn CompletionProvider> = Arc::new(
                AzureOpenAICompletionProvider::new(client, model.clone())
                    .with_temperature(EXTRACTION_TEMPERATURE),
            );
            pipeline = pipeline.with_completion(completion);
        }

        info!(
            index = %search.index_name,
            agents = state.invocations.is_some(),
            completion = config.inference.completion_model.is_some(),
            "Application state ready"
        );
        Ok(state
            .with_index(index)
            .with_pipeline(pipeline.configured(&config)))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("agents", &self.invocations.is_some())
            .field("index", &self.index.as_ref().map(|i| i.name().to_string()))
            .field("pipeline", &self.pipeline.is_some())
            .finish()
    }
}
