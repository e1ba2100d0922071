//! Length policy and dimension checks around an [`EmbeddingProvider`].

use crate::EmbeddingProvider;
use foundry_core::{
    ConfigError, EmbeddingVector, FoundryConfig, FoundryError, FoundryResult, LengthPolicy,
};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Turns free text into a vector of exactly `dimensions` floats.
///
/// Input longer than `max_chars` characters is either cut at that character
/// count (same input, same cut) or rejected, depending on the policy.
#[derive(Clone)]
pub struct DocumentEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: i32,
    max_chars: usize,
    policy: LengthPolicy,
}

impl DocumentEmbedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        dimensions: i32,
        max_chars: usize,
        policy: LengthPolicy,
    ) -> Self {
        Self {
            provider,
            dimensions,
            max_chars,
            policy,
        }
    }

    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &FoundryConfig) -> Self {
        Self::new(
            provider,
            config.inference.embedding_dimensions,
            config.embed_max_chars,
            config.embed_length_policy,
        )
    }

    /// The process-wide vector dimension.
    pub fn dimensions(&self) -> i32 {
        self.dimensions
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Fail if the provider is configured for a different dimension.
    pub fn check_provider(&self) -> FoundryResult<()> {
        let got = self.provider.dimensions();
        if got != self.dimensions {
            return Err(ConfigError::DimensionMismatch {
                expected: self.dimensions,
                got,
            }
            .into());
        }
        Ok(())
    }

    /// Apply the empty-input and length policies without calling the provider.
    pub fn prepare<'a>(&self, text: &'a str) -> FoundryResult<Cow<'a, str>> {
        if text.trim().is_empty() {
            return Err(FoundryError::invalid_input("text", "cannot embed empty text"));
        }

        let length = text.chars().count();
        if length <= self.max_chars {
            return Ok(Cow::Borrowed(text));
        }

        match self.policy {
            LengthPolicy::Reject => Err(FoundryError::InputTooLarge {
                length,
                limit: self.max_chars,
            }),
            LengthPolicy::Truncate => {
                let cut = text
                    .char_indices()
                    .nth(self.max_chars)
                    .map(|(idx, _)| idx)
                    .unwrap_or(text.len());
                debug!(length, limit = self.max_chars, "Truncating embedding input");
                Ok(Cow::Owned(text[..cut].to_string()))
            }
        }
    }

    pub async fn embed(&self, text: &str) -> FoundryResult<EmbeddingVector> {
        let input = self.prepare(text)?;
        let vector = self.provider.embed(&input).await?;
        vector.ensure_dimensions(self.dimensions)?;
        Ok(vector)
    }
}

impl std::fmt::Debug for DocumentEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEmbedder")
            .field("model", &self.provider.model_id())
            .field("dimensions", &self.dimensions)
            .field("max_chars", &self.max_chars)
            .field("policy", &self.policy)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::MockEmbeddingProvider;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The cut point depends only on the input and the limit.
        #[test]
        fn prop_truncation_is_prefix_of_fixed_length(text in "\\PC{1,80}", limit in 1usize..40) {
            let e = DocumentEmbedder::new(
                Arc::new(MockEmbeddingProvider::new("mock", 4)),
                4,
                limit,
                LengthPolicy::Truncate,
            );
            prop_assume!(!text.trim().is_empty());
            let prepared = e.prepare(&text).unwrap();
            prop_assert!(text.starts_with(prepared.as_ref()));
            prop_assert_eq!(prepared.chars().count(), text.chars().count().min(limit));
            prop_assert_eq!(e.prepare(&text).unwrap(), prepared);
        }
    }
}
