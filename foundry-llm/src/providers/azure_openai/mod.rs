//! Azure OpenAI provider implementation
//!
//! Embeddings and JSON-mode chat completions against named deployments.

pub mod client;
pub mod completion;
pub mod embedding;
pub mod types;

pub use client::{AzureCredential, AzureOpenAIClient};
pub use completion::AzureOpenAICompletionProvider;
pub use embedding::AzureOpenAIEmbeddingProvider;
