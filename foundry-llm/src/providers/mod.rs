//! Inference provider implementations
//!
//! Concrete implementations of the EmbeddingProvider and CompletionProvider
//! traits for Azure OpenAI deployments.

pub mod azure_openai;

pub use azure_openai::{
    AzureCredential, AzureOpenAIClient, AzureOpenAICompletionProvider,
    AzureOpenAIEmbeddingProvider,
};
