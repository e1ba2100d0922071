//! Foundry LLM - Inference Layer
//!
//! Provider-agnostic traits for the two inference calls the system makes:
//! embedding text and single-shot completion. Concrete providers live in
//! [`providers`]; deterministic mocks in [`mock`].

use async_trait::async_trait;
use foundry_core::{EmbeddingVector, FoundryResult};
use serde::{Deserialize, Serialize};

mod embedder;
pub mod mock;
pub mod providers;

pub use embedder::DocumentEmbedder;
pub use mock::{MockCompletionProvider, MockEmbeddingProvider};
pub use providers::{AzureOpenAIClient, AzureOpenAICompletionProvider, AzureOpenAIEmbeddingProvider};

// ============================================================================
// EMBEDDING PROVIDER TRAIT
// ============================================================================

/// Remote embedding endpoint.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    ///
    /// # Returns
    /// * `Ok(EmbeddingVector)` - The embedding vector
    /// * `Err(FoundryError::Transient)` - If the remote call failed and may be retried
    async fn embed(&self, text: &str) -> FoundryResult<EmbeddingVector>;

    /// The dimension count this provider is configured to produce.
    fn dimensions(&self) -> i32;

    fn model_id(&self) -> &str;
}

// ============================================================================
// COMPLETION PROVIDER TRAIT
// ============================================================================

/// A single-shot chat prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// Ask the model to answer with a single JSON object.
    pub json: bool,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json: false,
        }
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

/// Remote chat-completion endpoint.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run the prompt and return the assistant's text.
    async fn complete(&self, prompt: &Prompt) -> FoundryResult<String>;

    fn model_id(&self) -> &str;
}
