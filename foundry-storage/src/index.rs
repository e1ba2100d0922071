//! The project-log collection: schema management, writes and semantic search.

use crate::{SearchHit, VectorStore};
use chrono::Utc;
use foundry_core::{
    new_entry_id, EntryDraft, FoundryError, FoundryResult, IndexSchema, ProjectLogEntry,
};
use foundry_llm::DocumentEmbedder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Largest accepted `top_k` for [`ProjectLogIndex::search`].
pub const MAX_TOP_K: usize = 50;

/// Outcome of [`ProjectLogIndex::ensure_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// This call created the index.
    Created,
    /// A compatible index was already there.
    Existing,
}

/// Writes and searches project-log entries in one named index.
///
/// Every stored `context_vector` is computed from the stored `context` by
/// the embedder, or taken from the draft only when its hash still matches.
pub struct ProjectLogIndex {
    store: Arc<dyn VectorStore>,
    embedder: DocumentEmbedder,
    schema: IndexSchema,
    /// Set once the schema has been verified; never cleared.
    ready: AtomicBool,
}

impl ProjectLogIndex {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: DocumentEmbedder,
        index_name: impl Into<String>,
    ) -> Self {
        let schema = IndexSchema::project_log(index_name, embedder.dimensions());
        Self {
            store,
            embedder,
            schema,
            ready: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    pub fn embedder(&self) -> &DocumentEmbedder {
        &self.embedder
    }

    /// Create the index if absent, else verify it is compatible.
    ///
    /// The embedding provider's dimension is checked against the configured
    /// one before the store is contacted. Safe to call concurrently: racing
    /// first-time callers all succeed and at most one of them creates.
    ///
    /// # Errors
    /// - `Config` (dimension mismatch) if the provider disagrees with the schema
    /// - `SchemaMismatch` if an existing index cannot serve this schema
    pub async fn ensure_schema(&self) -> FoundryResult<SchemaStatus> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(SchemaStatus::Existing);
        }
        self.embedder.check_provider()?;

        let status = match self.store.get_index(&self.schema.name).await? {
            Some(existing) => {
                self.schema.check_compatible(&existing)?;
                SchemaStatus::Existing
            }
            None => {
                self.store.create_index(&self.schema).await?;
                // Someone else may have won the race with another definition.
                if let Some(existing) = self.store.get_index(&self.schema.name).await? {
                    self.schema.check_compatible(&existing)?;
                }
                info!(
                    index = %self.schema.name,
                    dimensions = self.embedder.dimensions(),
                    "Project log index ready"
                );
                SchemaStatus::Created
            }
        };

        self.ready.store(true, Ordering::Release);
        Ok(status)
    }

    /// Write one entry and return it as stored.
    ///
    /// A draft without an id gets a new one. A draft whose id already exists
    /// replaces that document but keeps its `creation_date`.
    pub async fn upsert(&self, draft: EntryDraft) -> FoundryResult<ProjectLogEntry> {
        // Checked here as well as in the embedder: a reused vector skips it.
        if draft.context.trim().is_empty() {
            return Err(FoundryError::invalid_input("context", "must not be empty"));
        }
        self.ensure_schema().await?;
        let now = Utc::now();

        let (id, creation_date) = match &draft.id {
            Some(id) if id.trim().is_empty() => {
                return Err(FoundryError::invalid_input("id", "must not be blank"));
            }
            Some(id) => {
                let existing = self.store.get_document(&self.schema.name, id).await?;
                (id.clone(), existing.map_or(now, |e| e.creation_date))
            }
            None => (new_entry_id(), now),
        };

        let context_vector = match draft.reusable_vector() {
            Some(vector) => {
                vector.ensure_dimensions(self.embedder.dimensions())?;
                debug!(id = %id, "Reusing precomputed context vector");
                vector.data.clone()
            }
            None => self.embedder.embed(&draft.context).await?.data,
        };

        let entry = draft.into_entry(id, context_vector, creation_date, now);
        self.store.upsert_document(&self.schema.name, &entry).await?;
        info!(
            index = %self.schema.name,
            id = %entry.id,
            entry_type = %entry.entry_type,
            "Upserted project log entry"
        );
        Ok(entry)
    }

    /// Stored entry by id, without its vector.
    pub async fn get(&self, id: &str) -> FoundryResult<Option<ProjectLogEntry>> {
        let entry = self.store.get_document(&self.schema.name, id).await?;
        Ok(entry.map(ProjectLogEntry::without_vector))
    }

    /// Entries closest in meaning to `query`, best first.
    pub async fn search(&self, query: &str, top_k: usize) -> FoundryResult<Vec<SearchHit>> {
        if !(1..=MAX_TOP_K).contains(&top_k) {
            return Err(FoundryError::invalid_input(
                "top_k",
                format!("must be between 1 and {}", MAX_TOP_K),
            ));
        }
        let vector = self.embedder.embed(query).await?;
        let hits = self
            .store
            .vector_search(&self.schema.name, &vector.data, top_k)
            .await?;
        debug!(index = %self.schema.name, hits = hits.len(), "Vector search");
        Ok(hits)
    }
}

impl std::fmt::Debug for ProjectLogIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectLogIndex")
            .field("index", &self.schema.name)
            .field("embedder", &self.embedder)
            .field("ready", &self.ready.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryVectorStore;
    use foundry_core::{ContextEmbedding, EntryType, LengthPolicy, Tags};
    use foundry_llm::MockEmbeddingProvider;

    const DIMS: i32 = 16;

    fn setup_with(
        provider: MockEmbeddingProvider,
    ) -> (Arc<InMemoryVectorStore>, ProjectLogIndex) {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = DocumentEmbedder::new(Arc::new(provider), DIMS, 1_000, LengthPolicy::Truncate);
        let index = ProjectLogIndex::new(store.clone(), embedder, "logs");
        (store, index)
    }

    fn setup() -> (Arc<InMemoryVectorStore>, ProjectLogIndex, MockEmbeddingProvider) {
        let provider = MockEmbeddingProvider::new("mock-embed", DIMS);
        let (store, index) = setup_with(provider.clone());
        (store, index, provider)
    }

    fn draft(title: &str, context: &str) -> EntryDraft {
        EntryDraft::new(title, EntryType::Meeting, context)
    }

    #[tokio::test]
    async fn test_ensure_schema_creates_once() {
        let (store, index, _) = setup();
        assert_eq!(index.ensure_schema().await.unwrap(), SchemaStatus::Created);
        assert_eq!(index.ensure_schema().await.unwrap(), SchemaStatus::Existing);
        assert_eq!(store.created_count(), 1);
        assert_eq!(store.create_call_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ensure_schema_all_succeed() {
        let store = Arc::new(InMemoryVectorStore::new());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let embedder = DocumentEmbedder::new(
                Arc::new(MockEmbeddingProvider::new("m", DIMS)),
                DIMS,
                1_000,
                LengthPolicy::Truncate,
            );
            let index = ProjectLogIndex::new(store.clone(), embedder, "logs");
            tasks.push(tokio::spawn(async move { index.ensure_schema().await }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(store.index_count(), 1);
        assert_eq!(store.created_count(), 1);
    }

    #[tokio::test]
    async fn test_existing_incompatible_index_is_schema_mismatch() {
        let store = Arc::new(InMemoryVectorStore::with_index(IndexSchema::project_log(
            "logs", 8,
        )));
        let embedder = DocumentEmbedder::new(
            Arc::new(MockEmbeddingProvider::new("m", DIMS)),
            DIMS,
            1_000,
            LengthPolicy::Truncate,
        );
        let index = ProjectLogIndex::new(store, embedder, "logs");
        let err = index.ensure_schema().await.unwrap_err();
        assert!(matches!(err, FoundryError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn test_provider_dimension_mismatch_is_reported_before_store_access() {
        let (store, index) = setup_with(MockEmbeddingProvider::new("m", DIMS + 1));
        let err = index.ensure_schema().await.unwrap_err();
        assert!(matches!(err, FoundryError::Config(_)));
        assert_eq!(store.create_call_count(), 0);
        assert_eq!(store.index_count(), 0);
    }

    #[tokio::test]
    async fn test_upsert_assigns_id_and_dates() {
        let (store, index, _) = setup();
        let entry = index.upsert(draft("Kickoff", "We met Contoso")).await.unwrap();

        assert!(!entry.id.is_empty());
        assert_eq!(entry.context_vector.len(), DIMS as usize);
        assert_eq!(entry.creation_date, entry.modified_date);
        assert_eq!(store.document_count("logs"), 1);

        let other = index.upsert(draft("Kickoff", "We met Contoso")).await.unwrap();
        assert_ne!(entry.id, other.id);
    }

    #[tokio::test]
    async fn test_upsert_existing_id_preserves_creation_date() {
        let (store, index, _) = setup();
        let first = index.upsert(draft("v1", "first body")).await.unwrap();

        let second = index
            .upsert(draft("v2", "second body").with_id(first.id.clone()))
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.creation_date, first.creation_date);
        assert!(second.modified_date >= first.modified_date);
        assert_ne!(second.context_vector, first.context_vector);
        assert_eq!(store.document_count("logs"), 1);
        assert_eq!(index.get(&first.id).await.unwrap().unwrap().title, "v2");
    }

    #[tokio::test]
    async fn test_upsert_reuses_matching_vector_only() {
        let (_, index, provider) = setup();
        let precomputed = index.embedder().embed("the body").await.unwrap();
        assert_eq!(provider.call_count(), 1);

        let mut fresh = draft("t", "the body");
        fresh.embedding = Some(ContextEmbedding::for_context("the body", precomputed.clone()));
        let stored = index.upsert(fresh).await.unwrap();
        assert_eq!(provider.call_count(), 1);
        assert_eq!(stored.context_vector, precomputed.data);

        let mut stale = draft("t", "an edited body");
        stale.embedding = Some(ContextEmbedding::for_context("the body", precomputed));
        index.upsert(stale).await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_upsert_stores_normalized_tags() {
        let (_, index, _) = setup();
        let mut d = draft("t", "body");
        d.tags = Tags::parse("azure, kubernetes , azure");
        let entry = index.upsert(d).await.unwrap();
        assert_eq!(entry.tags.as_slice(), ["azure", "kubernetes"]);
    }

    #[tokio::test]
    async fn test_upsert_empty_context_is_invalid_input() {
        let (store, index, _) = setup();
        let err = index.upsert(draft("t", "   ")).await.unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput { .. }));
        assert_eq!(store.document_count("logs"), 0);
    }

    #[tokio::test]
    async fn test_upsert_empty_context_rejected_even_with_matching_vector() {
        let (store, index, _) = setup();
        let vector = index.embedder().embed("placeholder").await.unwrap();
        let mut d = draft("t", "");
        d.embedding = Some(ContextEmbedding::for_context("", vector));
        assert!(d.reusable_vector().is_some());

        let err = index.upsert(d).await.unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput { ref field, .. } if field == "context"));
        assert_eq!(store.document_count("logs"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_of_distinct_ids_all_land() {
        let (store, index, _) = setup();
        let index = Arc::new(index);
        let mut tasks = Vec::new();
        for n in 0..16 {
            let index = index.clone();
            tasks.push(tokio::spawn(async move {
                let d = draft(&format!("entry {n}"), &format!("body number {n}"));
                index.upsert(d.with_id(format!("id-{n}"))).await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(store.document_count("logs"), 16);
        assert_eq!(store.created_count(), 1);
        for n in [0, 7, 15] {
            let stored = index.get(&format!("id-{n}")).await.unwrap().unwrap();
            assert_eq!(stored.title, format!("entry {n}"));
        }
    }

    #[tokio::test]
    async fn test_search_returns_closest_first_without_vectors() {
        let (_, index, _) = setup();
        let target = index
            .upsert(draft("AKS", "kubernetes cluster upgrade planning"))
            .await
            .unwrap();
        index.upsert(draft("Lunch", "sandwich menu")).await.unwrap();

        let hits = index
            .search("kubernetes cluster upgrade planning", 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.id, target.id);
        assert!(hits[0].entry.context_vector.is_empty());
    }

    #[tokio::test]
    async fn test_search_bounds_top_k() {
        let (_, index, provider) = setup();
        for top_k in [0, MAX_TOP_K + 1] {
            let err = index.search("q", top_k).await.unwrap_err();
            assert!(matches!(err, FoundryError::InvalidInput { .. }));
        }
        assert_eq!(provider.call_count(), 0);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::InMemoryVectorStore;
    use foundry_core::{EntryType, LengthPolicy};
    use foundry_llm::MockEmbeddingProvider;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Drafts without ids always become distinct documents.
        #[test]
        fn prop_upserts_without_id_never_collide(
            bodies in prop::collection::vec("[a-z]{1,12}( [a-z]{1,12}){0,4}", 1..12),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();

            let (ids, count) = runtime.block_on(async {
                let store = Arc::new(InMemoryVectorStore::new());
                let embedder = DocumentEmbedder::new(
                    Arc::new(MockEmbeddingProvider::new("m", 8)),
                    8,
                    1_000,
                    LengthPolicy::Truncate,
                );
                let index = ProjectLogIndex::new(store.clone(), embedder, "logs");
                let mut ids = std::collections::HashSet::new();
                for body in &bodies {
                    let entry = index
                        .upsert(EntryDraft::new("t", EntryType::Repo, body.clone()))
                        .await
                        .unwrap();
                    ids.insert(entry.id);
                }
                (ids, store.document_count("logs"))
            });

            prop_assert_eq!(ids.len(), bodies.len());
            prop_assert_eq!(count, bodies.len());
        }
    }
}
