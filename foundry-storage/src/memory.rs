//! In-memory vector store for tests and offline runs.

use crate::{SearchHit, VectorStore};
use async_trait::async_trait;
use foundry_core::{
    cosine_similarity, FoundryError, FoundryResult, IndexSchema, ProjectLogEntry,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct StoredIndex {
    schema: IndexSchema,
    documents: HashMap<String, ProjectLogEntry>,
}

/// Collections held in process memory. Search is exact cosine similarity.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    indexes: RwLock<HashMap<String, StoredIndex>>,
    create_calls: AtomicUsize,
    indexes_created: AtomicUsize,
    upserts: AtomicUsize,
    unreachable: AtomicBool,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `schema`, e.g. one created by an older release.
    pub fn with_index(schema: IndexSchema) -> Self {
        let store = Self::default();
        if let Ok(mut indexes) = store.indexes.write() {
            indexes.insert(
                schema.name.clone(),
                StoredIndex {
                    schema,
                    documents: HashMap::new(),
                },
            );
        }
        store
    }

    /// Make every call fail with a transient error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn index_count(&self) -> usize {
        self.indexes.read().map(|i| i.len()).unwrap_or_default()
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.indexes
            .read()
            .ok()
            .and_then(|i| i.get(index).map(|s| s.documents.len()))
            .unwrap_or_default()
    }

    /// Number of `create_index` calls, successful or not.
    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of indexes actually created.
    pub fn created_count(&self) -> usize {
        self.indexes_created.load(Ordering::SeqCst)
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> FoundryResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(FoundryError::transient("search", "connection refused"));
        }
        Ok(())
    }

    fn read(&self) -> FoundryResult<RwLockReadGuard<'_, HashMap<String, StoredIndex>>> {
        self.check_reachable()?;
        self.indexes
            .read()
            .map_err(|_| FoundryError::transient("search", "index lock poisoned"))
    }

    fn write(&self) -> FoundryResult<RwLockWriteGuard<'_, HashMap<String, StoredIndex>>> {
        self.check_reachable()?;
        self.indexes
            .write()
            .map_err(|_| FoundryError::transient("search", "index lock poisoned"))
    }
}

fn missing_index(name: &str) -> FoundryError {
    FoundryError::not_found(format!("index {}", name))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn get_index(&self, name: &str) -> FoundryResult<Option<IndexSchema>> {
        Ok(self.read()?.get(name).map(|i| i.schema.clone()))
    }

    async fn create_index(&self, schema: &IndexSchema) -> FoundryResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut indexes = self.write()?;
        if !indexes.contains_key(&schema.name) {
            indexes.insert(
                schema.name.clone(),
                StoredIndex {
                    schema: schema.clone(),
                    documents: HashMap::new(),
                },
            );
            self.indexes_created.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn upsert_document(&self, index: &str, entry: &ProjectLogEntry) -> FoundryResult<()> {
        let mut indexes = self.write()?;
        let stored = indexes.get_mut(index).ok_or_else(|| missing_index(index))?;

        if let Some(dims) = stored.schema.vector_dimensions() {
            if entry.context_vector.len() != dims as usize {
                return Err(FoundryError::invalid_input(
                    "context_vector",
                    format!(
                        "expected {} dimensions, got {}",
                        dims,
                        entry.context_vector.len()
                    ),
                ));
            }
        }

        stored.documents.insert(entry.id.clone(), entry.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> FoundryResult<Option<ProjectLogEntry>> {
        let indexes = self.read()?;
        let stored = indexes.get(index).ok_or_else(|| missing_index(index))?;
        Ok(stored.documents.get(id).cloned())
    }

    async fn vector_search(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
    ) -> FoundryResult<Vec<SearchHit>> {
        let indexes = self.read()?;
        let stored = indexes.get(index).ok_or_else(|| missing_index(index))?;

        let mut hits = Vec::with_capacity(stored.documents.len());
        for entry in stored.documents.values() {
            let score = cosine_similarity(vector, &entry.context_vector)?;
            hits.push(SearchHit {
                entry: entry.clone().without_vector(),
                score,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

// =============================================================================
// TESTS
// =============================================================================
