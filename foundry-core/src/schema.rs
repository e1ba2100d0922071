//! Index schema for the project-log collection.
//!
//! Serializes to the search service's REST index definition, so the same
//! value is sent on create and compared against what the service returns.

use crate::{FoundryError, FoundryResult};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_INDEX_NAME: &str = "project-log-index";
pub const VECTOR_FIELD: &str = "context_vector";
pub const VECTOR_PROFILE: &str = "hnsw-profile";
pub const VECTOR_ALGORITHM: &str = "hnsw";

// ============================================================================
// FIELD TYPES
// ============================================================================

/// Field data types used by the schema (EDM names on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "Edm.String")]
    String,
    #[serde(rename = "Collection(Edm.String)")]
    StringCollection,
    #[serde(rename = "Collection(Edm.Single)")]
    SingleCollection,
    #[serde(rename = "Edm.DateTimeOffset")]
    DateTimeOffset,
    /// Any type this schema never declares.
    #[serde(other)]
    Other,
}

/// One field definition with its search capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub searchable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filterable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sortable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub facetable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
}

/// The service reports unset properties as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FieldSpec {
    fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            key: false,
            searchable: false,
            filterable: false,
            sortable: false,
            facetable: false,
            dimensions: None,
            vector_search_profile: None,
        }
    }

    fn key(mut self) -> Self {
        self.key = true;
        self
    }

    fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    fn facetable(mut self) -> Self {
        self.facetable = true;
        self
    }

    fn vector(name: &str, dimensions: i32) -> Self {
        let mut field = Self::new(name, FieldType::SingleCollection).searchable();
        field.dimensions = Some(dimensions);
        field.vector_search_profile = Some(VECTOR_PROFILE.to_string());
        field
    }
}

// ============================================================================
// VECTOR SEARCH
// ============================================================================

/// Distance metric for the vector graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VectorMetric {
    Cosine,
    Euclidean,
    DotProduct,
}

/// HNSW graph-construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswParameters {
    pub m: u32,
    pub ef_construction: u32,
    pub ef_search: u32,
    pub metric: VectorMetric,
}

impl Default for HnswParameters {
    fn default() -> Self {
        Self {
            m: 4,
            ef_construction: 400,
            ef_search: 500,
            metric: VectorMetric::Cosine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorAlgorithm {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub hnsw_parameters: Option<HnswParameters>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorProfile {
    pub name: String,
    pub algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorSearchConfig {
    #[serde(default)]
    pub algorithms: Vec<VectorAlgorithm>,
    #[serde(default)]
    pub profiles: Vec<VectorProfile>,
}

// ============================================================================
// INDEX SCHEMA
// ============================================================================

/// Full index definition: fields plus vector-search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vector_search: VectorSearchConfig,
}

impl IndexSchema {
    /// The project-log schema for a vector dimension of `dimensions`.
    pub fn project_log(name: impl Into<String>, dimensions: i32) -> Self {
        use FieldType::{DateTimeOffset, StringCollection};
        let fields = vec![
            FieldSpec::new("id", FieldType::String).key().filterable(),
            FieldSpec::new("title", FieldType::String).searchable().filterable().sortable(),
            FieldSpec::new("type", FieldType::String).searchable().filterable().facetable(),
            FieldSpec::new("customer_name", FieldType::String)
                .searchable()
                .filterable()
                .facetable(),
            FieldSpec::new("short_summary", FieldType::String).searchable(),
            FieldSpec::new("context", FieldType::String).searchable(),
            FieldSpec::vector(VECTOR_FIELD, dimensions),
            FieldSpec::new("project_name", FieldType::String)
                .searchable()
                .filterable()
                .facetable(),
            FieldSpec::new("tags", StringCollection)
                .searchable()
                .filterable()
                .facetable(),
            FieldSpec::new("reference_url", FieldType::String).searchable(),
            FieldSpec::new("architecture", FieldType::String).searchable(),
            FieldSpec::new("creation_date", DateTimeOffset)
                .filterable()
                .sortable(),
            FieldSpec::new("modified_date", DateTimeOffset)
                .filterable()
                .sortable(),
        ];

        Self {
            name: name.into(),
            fields,
            vector_search: VectorSearchConfig {
                algorithms: vec![VectorAlgorithm {
                    name: VECTOR_ALGORITHM.to_string(),
                    kind: "hnsw".to_string(),
                    hnsw_parameters: Some(HnswParameters::default()),
                }],
                profiles: vec![VectorProfile {
                    name: VECTOR_PROFILE.to_string(),
                    algorithm: VECTOR_ALGORITHM.to_string(),
                }],
            },
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Configured dimension of the vector field.
    pub fn vector_dimensions(&self) -> Option<i32> {
        self.field(VECTOR_FIELD).and_then(|f| f.dimensions)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Verify that `existing` can serve every read and write of this schema.
    ///
    /// Extra fields on the existing index are tolerated. Missing fields,
    /// differing types, a different key or a different vector dimension are
    /// reported as `SchemaMismatch`.
    pub fn check_compatible(&self, existing: &IndexSchema) -> FoundryResult<()> {
        let mismatch = |reason: String| FoundryError::SchemaMismatch {
            index: existing.name.clone(),
            reason,
        };

        for required in &self.fields {
            let Some(found) = existing.field(&required.name) else {
                return Err(mismatch(format!("missing field '{}'", required.name)));
            };
            if found.field_type != required.field_type {
                return Err(mismatch(format!(
                    "field '{}' has type {:?}, expected {:?}",
                    required.name, found.field_type, required.field_type
                )));
            }
            if found.key != required.key {
                return Err(mismatch(format!(
                    "field '{}' key flag is {}, expected {}",
                    required.name, found.key, required.key
                )));
            }
            if required.dimensions.is_some() && found.dimensions != required.dimensions {
                return Err(mismatch(format!(
                    "field '{}' has {} dimensions, expected {}",
                    required.name,
                    found
                        .dimensions
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "no".to_string()),
                    required.dimensions.unwrap_or_default()
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
