//! Foundry Storage - Vector Store and Project-Log Index
//!
//! Defines the document store abstraction the project-log index writes to.
//! The Azure AI Search REST client and an in-memory store both implement it.

mod azure_search;
mod index;
mod memory;

pub use azure_search::AzureSearchClient;
pub use index::{ProjectLogIndex, SchemaStatus, MAX_TOP_K};
pub use memory::InMemoryVectorStore;

use async_trait::async_trait;
use foundry_core::{FoundryResult, IndexSchema, ProjectLogEntry};
use serde::{Deserialize, Serialize};

// ============================================================================
// SEARCH RESULTS
// ============================================================================

/// One vector search match. Higher scores are closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub entry: ProjectLogEntry,
    pub score: f32,
}

// ============================================================================
// VECTOR STORE TRAIT
// ============================================================================

/// Remote document store holding named collections with a vector field.
///
/// Implementations must tolerate concurrent `create_index` calls for the
/// same name: every caller observes success.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Definition of the named index, or `None` if it does not exist.
    async fn get_index(&self, name: &str) -> FoundryResult<Option<IndexSchema>>;

    /// Create `schema`. An index of the same name that already exists is
    /// left untouched and reported as success.
    async fn create_index(&self, schema: &IndexSchema) -> FoundryResult<()>;

    /// Insert or fully replace the document with `entry.id`.
    async fn upsert_document(&self, index: &str, entry: &ProjectLogEntry) -> FoundryResult<()>;

    async fn get_document(&self, index: &str, id: &str) -> FoundryResult<Option<ProjectLogEntry>>;

    /// Nearest documents to `vector`, best first, at most `top_k`.
    ///
    /// Returned entries carry no `context_vector`.
    async fn vector_search(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
    ) -> FoundryResult<Vec<SearchHit>>;
}
