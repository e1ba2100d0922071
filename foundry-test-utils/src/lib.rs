//! Foundry Test Utilities
//!
//! Shared test infrastructure for the foundry workspace:
//! - Proptest generators for the core types
//! - Fixtures: canned configuration, drafts and extraction answers
//! - A [`Harness`] wiring every in-process collaborator into the real components
//! - Assertions on the error taxonomy

// Re-export the in-process collaborators from their source crates
pub use foundry_agents::{InvocationService, MockAgentPlatform, RunScript};
pub use foundry_llm::{DocumentEmbedder, MockCompletionProvider, MockEmbeddingProvider};
pub use foundry_pipeline::{IngestPipeline, MockContentFetcher};
pub use foundry_storage::{InMemoryVectorStore, ProjectLogIndex, VectorStore};

// Re-export core types for convenience
pub use foundry_core::{
    EntryDraft, EntryType, ErrorKind, FoundryConfig, FoundryError, FoundryResult,
    InvocationHandle, InvocationStatus, LengthPolicy, ProjectLogEntry, Tags, Timestamp,
    NATIVE_STATUS_TABLE,
};

use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for the core types.

    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    pub fn arb_entry_type() -> impl Strategy<Value = EntryType> {
        prop_oneof![
            Just(EntryType::Workshop),
            Just(EntryType::Meeting),
            Just(EntryType::Blog),
            Just(EntryType::Repo),
        ]
    }

    pub fn arb_invocation_status() -> impl Strategy<Value = InvocationStatus> {
        proptest::sample::select(InvocationStatus::ALL.to_vec())
    }

    /// A native status name from the platform vocabulary, in random case.
    pub fn arb_native_status() -> impl Strategy<Value = String> {
        let names: Vec<&'static str> = NATIVE_STATUS_TABLE.iter().map(|(name, _)| *name).collect();
        (proptest::sample::select(names), any::<bool>()).prop_map(|(name, upper)| {
            if upper {
                name.to_ascii_uppercase()
            } else {
                name.to_string()
            }
        })
    }

    /// An id in the `<thread_id>::<run_id>` wire format.
    pub fn arb_invocation_id() -> impl Strategy<Value = String> {
        ("thread_[a-zA-Z0-9]{1,12}", "run_[a-zA-Z0-9]{1,12}")
            .prop_map(|(thread, run)| format!("{}::{}", thread, run))
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// A comma-separated tag string with stray whitespace and repeats.
    pub fn arb_tag_input() -> impl Strategy<Value = String> {
        prop::collection::vec("[ ]{0,2}[A-Za-z][A-Za-z0-9 ]{0,10}", 0..8)
            .prop_map(|items| items.join(","))
    }

    pub fn arb_entry_draft() -> impl Strategy<Value = EntryDraft> {
        (
            "[A-Z][a-z ]{2,20}",
            arb_entry_type(),
            "[A-Za-z][A-Za-z ,.]{10,120}",
            "[A-Za-z ]{0,20}",
            arb_tag_input(),
        )
            .prop_map(|(title, entry_type, context, customer, tags)| {
                let mut draft = EntryDraft::new(title, entry_type, context);
                draft.customer_name = customer;
                draft.tags = Tags::parse(&tags);
                draft
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;

    /// Vector dimension used across the harness.
    pub const DIMS: i32 = 16;
    pub const INDEX_NAME: &str = "project-log-test";
    pub const STORY_URL: &str = "https://www.microsoft.com/en/customers/story/contoso";
    pub const STORY_TEXT: &str =
        "Contoso modernized its retail platform on Azure Kubernetes Service and Cosmos DB.";

    pub const CASE_STUDY_JSON: &str = r#"{
        "title": "Contoso modernizes retail on AKS",
        "customer_name": "Contoso",
        "short_summary": "Contoso moved its retail platform to AKS.",
        "context": "Contoso struggled with seasonal peaks and adopted AKS with Cosmos DB, cutting costs by 30%.",
        "tags": ["Azure Kubernetes Service", "Azure Cosmos DB"],
        "reference_url": ""
    }"#;

    pub const ARCHITECTURE_JSON: &str = r#"{
        "diagram_type": "solution_architecture",
        "components": [
            {"name": "AKS", "type": "Compute", "description": "Runs the storefront services"},
            {"name": "Cosmos DB", "type": "Database", "description": "Stores orders"}
        ],
        "connections": [{"from": "AKS", "to": "Cosmos DB", "description": "Order writes"}],
        "patterns": ["microservices", "event sourcing"]
    }"#;

    /// Configuration matching the harness: small vectors, fast polling.
    pub fn test_config() -> FoundryConfig {
        let mut config = FoundryConfig::default();
        config.inference.embedding_dimensions = DIMS;
        config.inference.completion_model = Some("mock-completion".to_string());
        config.poll_interval = Duration::ZERO;
        config.agent_timeout = Duration::from_secs(5);
        config
    }

    pub fn meeting_draft(title: &str, context: &str) -> EntryDraft {
        let mut draft = EntryDraft::new(title, EntryType::Meeting, context);
        draft.project_name = "Contoso Migration".to_string();
        draft.tags = Tags::parse("azure, kubernetes , azure");
        draft
    }

    /// Completion mock answering both extraction prompts with the canned JSON.
    pub fn extraction_completion() -> MockCompletionProvider {
        MockCompletionProvider::new(|prompt| {
            if prompt.system == foundry_pipeline::CASE_STUDY_INSTRUCTIONS {
                Ok(CASE_STUDY_JSON.to_string())
            } else {
                Ok(ARCHITECTURE_JSON.to_string())
            }
        })
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Every remote collaborator replaced by its in-process mock, wired into
/// the real invocation service, index and pipeline.
///
/// The mock agent platform starts with no agents deployed; the content
/// fetcher serves [`fixtures::STORY_TEXT`] at [`fixtures::STORY_URL`].
pub struct Harness {
    pub config: FoundryConfig,
    pub platform: Arc<MockAgentPlatform>,
    pub store: Arc<InMemoryVectorStore>,
    pub embeddings: MockEmbeddingProvider,
    pub completion: MockCompletionProvider,
    pub fetcher: Arc<MockContentFetcher>,
    pub invocations: InvocationService,
    pub index: Arc<ProjectLogIndex>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_fetcher(
            MockContentFetcher::new().with_page(fixtures::STORY_URL, fixtures::STORY_TEXT),
        )
    }

    pub fn with_fetcher(fetcher: MockContentFetcher) -> Self {
        let config = fixtures::test_config();
        let platform = Arc::new(MockAgentPlatform::new());
        let store = Arc::new(InMemoryVectorStore::new());
        let embeddings = MockEmbeddingProvider::new("mock-embed", fixtures::DIMS);
        let embedder = DocumentEmbedder::from_config(Arc::new(embeddings.clone()), &config);
        let index = Arc::new(ProjectLogIndex::new(
            store.clone(),
            embedder,
            fixtures::INDEX_NAME,
        ));

        Self {
            invocations: InvocationService::new(platform.clone(), config.poll_interval),
            completion: fixtures::extraction_completion(),
            fetcher: Arc::new(fetcher),
            config,
            platform,
            store,
            embeddings,
            index,
        }
    }

    /// Deploy both extraction agents, scripted to answer with the canned JSON.
    pub fn with_extraction_agents(self) -> Self {
        self.platform
            .add_agent("asst_case_study", &self.config.case_study_agent_name);
        self.platform
            .add_agent("asst_architecture", &self.config.architecture_agent_name);
        self.platform.script(
            "asst_case_study",
            RunScript::completes_with(fixtures::CASE_STUDY_JSON),
        );
        self.platform.script(
            "asst_architecture",
            RunScript::completes_with(fixtures::ARCHITECTURE_JSON),
        );
        self
    }

    /// Pipeline with agents and direct completion both available.
    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(self.fetcher.clone(), self.index.clone())
            .with_agents(self.invocations.clone())
            .with_completion(Arc::new(self.completion.clone()))
            .configured(&self.config)
    }

    pub fn document_count(&self) -> usize {
        self.store.document_count(fixtures::INDEX_NAME)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on the error taxonomy.

    use super::*;

    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &FoundryResult<T>, kind: ErrorKind) {
        match result {
            Err(e) => assert_eq!(e.kind(), kind, "wrong error kind: {:?}", e),
            Ok(v) => panic!("Expected {} error, got Ok({:?})", kind, v),
        }
    }

    #[track_caller]
    pub fn assert_retryable<T: std::fmt::Debug>(result: &FoundryResult<T>) {
        match result {
            Err(e) => assert!(e.is_retryable(), "Expected retryable error, got {:?}", e),
            Ok(v) => panic!("Expected retryable error, got Ok({:?})", v),
        }
    }

    /// A stored entry carries a vector of the harness dimension.
    #[track_caller]
    pub fn assert_vector_dims(entry: &ProjectLogEntry, dims: i32) {
        assert_eq!(
            entry.context_vector.len(),
            dims as usize,
            "entry {} has a vector of the wrong length",
            entry.id
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
