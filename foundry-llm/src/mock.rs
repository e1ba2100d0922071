//! Deterministic in-process providers for tests.

use crate::{CompletionProvider, EmbeddingProvider, Prompt};
use async_trait::async_trait;
use foundry_core::{EmbeddingVector, FoundryError, FoundryResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// MOCK EMBEDDING PROVIDER
// ============================================================================

/// Mock embedding provider.
/// Generates deterministic embeddings based on text content.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    model_id: String,
    dimensions: i32,
    /// Length of the vectors actually returned, when it should differ.
    returned_dimensions: Option<i32>,
    failure: Option<FoundryError>,
    calls: Arc<AtomicUsize>,
}

impl MockEmbeddingProvider {
    pub fn new(model_id: impl Into<String>, dimensions: i32) -> Self {
        Self {
            model_id: model_id.into(),
            dimensions,
            returned_dimensions: None,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report `dimensions` but return vectors of another length.
    pub fn returning_dimensions(mut self, returned: i32) -> Self {
        self.returned_dimensions = Some(returned);
        self
    }

    /// Fail every call with `error`.
    pub fn failing(mut self, error: FoundryError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generate a deterministic embedding from text.
    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let dims = self.returned_dimensions.unwrap_or(self.dimensions).max(0) as usize;
        let mut data = vec![0.0f32; dims];
        if dims == 0 {
            return data;
        }

        for (i, byte) in text.bytes().enumerate() {
            let idx = i % dims;
            data[idx] += (byte as f32) / 255.0;
        }

        // Normalize to unit vector
        let norm: f32 = data.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut data {
                *x /= norm;
            }
        }

        data
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> FoundryResult<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(EmbeddingVector::new(
            self.generate_embedding(text),
            self.model_id.clone(),
        ))
    }

    fn dimensions(&self) -> i32 {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// MOCK COMPLETION PROVIDER
// ============================================================================

type Responder = dyn Fn(&Prompt) -> FoundryResult<String> + Send + Sync;

/// Mock completion provider driven by a responder function.
/// Records every prompt it receives.
#[derive(Clone)]
pub struct MockCompletionProvider {
    model_id: String,
    responder: Arc<Responder>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl MockCompletionProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Prompt) -> FoundryResult<String> + Send + Sync + 'static,
    {
        Self {
            model_id: "mock-completion".to_string(),
            responder: Arc::new(responder),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer with the same text.
    pub fn fixed(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::new(move |_| Ok(response.clone()))
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, prompt: &Prompt) -> FoundryResult<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }
        (self.responder)(prompt)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl std::fmt::Debug for MockCompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCompletionProvider")
            .field("model_id", &self.model_id)
            .field("calls", &self.call_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_mock_embedding_deterministic(
            dimensions in 1i32..512i32,
            text in ".{1,100}"
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let provider = MockEmbeddingProvider::new("test", dimensions);
            let e1 = rt.block_on(provider.embed(&text)).unwrap();
            let e2 = rt.block_on(provider.embed(&text)).unwrap();

            prop_assert_eq!(e1.data.len(), dimensions as usize);
            prop_assert_eq!(e1, e2);
        }
    }
}
