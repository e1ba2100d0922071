//! Embedding vector operations

use crate::{ConfigError, FoundryError, FoundryResult};
use serde::{Deserialize, Serialize};

/// Dense embedding produced for a document's `context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub data: Vec<f32>,
    /// Deployment or model name that produced the vector.
    pub model_id: String,
    /// Number of dimensions (must match data.len()).
    pub dimensions: i32,
}

impl EmbeddingVector {
    pub fn new(data: Vec<f32>, model_id: impl Into<String>) -> Self {
        let dimensions = data.len() as i32;
        Self {
            data,
            model_id: model_id.into(),
            dimensions,
        }
    }

    /// Fail unless the vector has exactly `expected` dimensions.
    pub fn ensure_dimensions(&self, expected: i32) -> FoundryResult<()> {
        if self.dimensions != expected || self.data.len() != expected as usize {
            return Err(ConfigError::DimensionMismatch {
                expected,
                got: self.data.len() as i32,
            }
            .into());
        }
        Ok(())
    }

    /// Cosine similarity in `[-1, 1]`; zero vectors score 0.
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> FoundryResult<f32> {
        cosine_similarity(&self.data, &other.data)
    }

    pub fn is_valid(&self) -> bool {
        self.dimensions > 0 && self.data.len() == self.dimensions as usize
    }
}

/// Cosine similarity over raw slices.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> FoundryResult<f32> {
    if a.len() != b.len() {
        return Err(FoundryError::invalid_input(
            "vector",
            format!("dimension mismatch: {} vs {}", a.len(), b.len()),
        ));
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (norm_a * norm_b))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_dimensions() {
        let vec = EmbeddingVector::new(vec![0.0, 1.0, 0.5], "text-embedding-3-small");
        assert_eq!(vec.dimensions, 3);
        assert_eq!(vec.model_id, "text-embedding-3-small");
        assert!(vec.is_valid());
    }

    #[test]
    fn test_empty_vector_is_invalid() {
        let vec = EmbeddingVector::new(vec![], "m");
        assert!(!vec.is_valid());
    }

    #[test]
    fn test_ensure_dimensions_reports_actual_length() {
        let vec = EmbeddingVector::new(vec![0.1; 768], "m");
        assert!(vec.ensure_dimensions(768).is_ok());
        let err = vec.ensure_dimensions(1536).unwrap_err();
        assert_eq!(
            err,
            FoundryError::Config(ConfigError::DimensionMismatch {
                expected: 1536,
                got: 768
            })
        );
    }

    #[test]
    fn test_cosine_similarity_identical_vectors() {
        let a = EmbeddingVector::new(vec![1.0, 0.0, 0.0], "m");
        let sim = a.cosine_similarity(&a.clone()).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        let opposite = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((opposite + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector_returns_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput { .. }));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_cosine_is_symmetric_and_bounded(
            pair in (1usize..32).prop_flat_map(|n| (
                prop::collection::vec(-10.0f32..10.0, n),
                prop::collection::vec(-10.0f32..10.0, n),
            ))
        ) {
            let (a, b) = pair;
            let ab = cosine_similarity(&a, &b).unwrap();
            let ba = cosine_similarity(&b, &a).unwrap();
            prop_assert!((ab - ba).abs() < 1e-5);
            prop_assert!((-1.0001..=1.0001).contains(&ab));
        }
    }
}
