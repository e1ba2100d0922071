//! Project-log documents: entry type, tag set and the persisted entry.

use crate::schema::null_as_default;
use crate::{content_hash_hex, EmbeddingVector, FoundryError, FoundryResult, Timestamp};
use serde::{Deserialize, Serialize};

// ============================================================================
// ENTRY TYPE
// ============================================================================

/// Kind of project log entry.
///
/// Serialized lowercase; read back case-insensitively like [`EntryType::from_db_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EntryType {
    Workshop,
    Meeting,
    Blog,
    Repo,
}

impl EntryType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EntryType::Workshop => "workshop",
            EntryType::Meeting => "meeting",
            EntryType::Blog => "blog",
            EntryType::Repo => "repo",
        }
    }

    /// Case-insensitive parse of the stored form.
    pub fn from_db_str(s: &str) -> FoundryResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workshop" => Ok(EntryType::Workshop),
            "meeting" => Ok(EntryType::Meeting),
            "blog" => Ok(EntryType::Blog),
            "repo" => Ok(EntryType::Repo),
            _ => Err(FoundryError::invalid_input(
                "entry_type",
                format!("'{}' is not one of workshop, meeting, blog, repo", s),
            )),
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl TryFrom<String> for EntryType {
    type Error = FoundryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_db_str(&s)
    }
}

impl std::str::FromStr for EntryType {
    type Err = FoundryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// TAGS
// ============================================================================

/// Set of tags, deduplicated case-sensitively, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a comma-separated string, trim each item and drop empties.
    pub fn parse(input: &str) -> Self {
        input.split(',').collect()
    }

    /// Add a tag. Returns false if it was blank or already present.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag.as_ref());
        }
        tags
    }
}

impl From<Vec<String>> for Tags {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(value: Tags) -> Self {
        value.0
    }
}

// ============================================================================
// CONTEXT EMBEDDING
// ============================================================================

/// A vector bound to the exact `context` text it was computed from.
///
/// Only a matching hash lets a caller-supplied vector skip re-embedding, so a
/// stored `context_vector` always corresponds to the stored `context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEmbedding {
    pub context_hash: String,
    pub vector: EmbeddingVector,
}

impl ContextEmbedding {
    pub fn for_context(context: &str, vector: EmbeddingVector) -> Self {
        Self {
            context_hash: content_hash_hex(context.as_bytes()),
            vector,
        }
    }

    pub fn matches(&self, context: &str) -> bool {
        self.context_hash == content_hash_hex(context.as_bytes())
    }
}

// ============================================================================
// ENTRIES
// ============================================================================

/// An entry as submitted for writing; identity and dates are assigned on upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub id: Option<String>,
    pub title: String,
    pub entry_type: EntryType,
    pub customer_name: String,
    pub short_summary: String,
    pub context: String,
    pub project_name: String,
    pub tags: Tags,
    pub reference_url: String,
    pub architecture: String,
    pub embedding: Option<ContextEmbedding>,
}

impl EntryDraft {
    pub fn new(title: impl Into<String>, entry_type: EntryType, context: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            entry_type,
            customer_name: String::new(),
            short_summary: String::new(),
            context: context.into(),
            project_name: String::new(),
            tags: Tags::new(),
            reference_url: String::new(),
            architecture: String::new(),
            embedding: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Precomputed vector for the current `context`, if it still matches.
    pub fn reusable_vector(&self) -> Option<&EmbeddingVector> {
        self.embedding
            .as_ref()
            .filter(|e| e.matches(&self.context))
            .map(|e| &e.vector)
    }

    /// Assemble the stored document.
    pub fn into_entry(
        self,
        id: String,
        context_vector: Vec<f32>,
        creation_date: Timestamp,
        modified_date: Timestamp,
    ) -> ProjectLogEntry {
        ProjectLogEntry {
            id,
            title: self.title,
            entry_type: self.entry_type,
            customer_name: self.customer_name,
            short_summary: self.short_summary,
            context: self.context,
            context_vector,
            project_name: self.project_name,
            tags: self.tags,
            reference_url: self.reference_url,
            architecture: self.architecture,
            creation_date,
            modified_date,
        }
    }
}

/// The persisted document, serialized with the index field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectLogEntry {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub short_summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub context_vector: Vec<f32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reference_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub architecture: String,
    pub creation_date: Timestamp,
    pub modified_date: Timestamp,
}

impl ProjectLogEntry {
    /// Copy without the vector, for returning to callers.
    pub fn without_vector(mut self) -> Self {
        self.context_vector = Vec::new();
        self
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
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Parsed tags are trimmed, non-empty and unique.
        #[test]
        fn prop_tags_are_normalized(items in prop::collection::vec("[ a-c]{0,4}", 0..10)) {
            let tags = Tags::parse(&items.join(","));
            let mut seen = std::collections::HashSet::new();
            for tag in tags.iter() {
                prop_assert!(!tag.is_empty());
                prop_assert_eq!(tag, tag.trim());
                prop_assert!(seen.insert(tag.to_string()));
            }
            for item in &items {
                let trimmed = item.trim();
                if !trimmed.is_empty() {
                    prop_assert!(tags.contains(trimmed));
                }
            }
        }

        /// Re-parsing the joined output is a fixed point.
        #[test]
        fn prop_tags_parse_is_idempotent(input in "[a-z ,]{0,30}") {
            let once = Tags::parse(&input);
            let twice = Tags::parse(&once.as_slice().join(","));
            prop_assert_eq!(once, twice);
        }
    }
}
