//! Argument validation and extraction
//!
//! Arguments arrive as one flat JSON object of strings and numbers. They are
//! first checked against the tool's input schema, then read field by field.

use crate::error::{ToolError, ToolResult};
use foundry_core::{EntryDraft, EntryType, Tags};
use serde_json::{Map, Value as JsonValue};

/// Validate tool input against its JSON Schema.
pub fn validate_tool_input(input: &JsonValue, schema: &JsonValue) -> ToolResult<()> {
    let validator = jsonschema::draft202012::new(schema).map_err(|e| {
        ToolError::invalid_argument("input_schema", format!("invalid schema: {}", e))
    })?;

    let errors: Vec<String> = validator.iter_errors(input).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        return Ok(());
    }
    Err(ToolError::new(
        foundry_core::ErrorKind::InvalidInput,
        format!("arguments do not match the tool schema: {}", errors.join("; ")),
    )
    .with_details(JsonValue::from(errors)))
}

/// Read-only view of a call's arguments.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    fields: Option<&'a Map<String, JsonValue>>,
}

impl<'a> Args<'a> {
    /// `null` is treated as an empty argument object.
    pub fn new(value: &'a JsonValue) -> ToolResult<Self> {
        match value {
            JsonValue::Null => Ok(Self { fields: None }),
            JsonValue::Object(map) => Ok(Self { fields: Some(map) }),
            _ => Err(ToolError::invalid_argument(
                "arguments",
                "expected a JSON object",
            )),
        }
    }

    fn get(&self, field: &str) -> Option<&'a JsonValue> {
        self.fields
            .and_then(|f| f.get(field))
            .filter(|v| !v.is_null())
    }

    /// A string that must be present and not blank.
    pub fn required_str(&self, field: &str) -> ToolResult<&'a str> {
        let value = self
            .optional_str(field)?
            .ok_or_else(|| ToolError::missing_field(field))?;
        if value.trim().is_empty() {
            return Err(ToolError::invalid_argument(field, "must not be empty"));
        }
        Ok(value)
    }

    pub fn optional_str(&self, field: &str) -> ToolResult<Option<&'a str>> {
        match self.get(field) {
            None => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ToolError::invalid_argument(
                field,
                format!("expected a string, got {}", other),
            )),
        }
    }

    /// Optional string, empty when absent.
    pub fn str_or_empty(&self, field: &str) -> ToolResult<String> {
        Ok(self.optional_str(field)?.unwrap_or_default().to_string())
    }

    /// A non-negative integer, given as a number or a numeric string.
    /// Whole-valued floats such as `5.0` are accepted.
    pub fn usize_or(&self, field: &str, default: usize) -> ToolResult<usize> {
        match self.get(field) {
            None => Ok(default),
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().and_then(whole_u64))
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| ToolError::invalid_argument(field, "expected a non-negative integer")),
            Some(JsonValue::String(s)) => s
                .trim()
                .parse::<usize>()
                .map_err(|e| ToolError::invalid_argument(field, e)),
            Some(other) => Err(ToolError::invalid_argument(
                field,
                format!("expected an integer, got {}", other),
            )),
        }
    }

    /// Entry type, parsed case-insensitively, falling back to `default`.
    pub fn entry_type_or(&self, field: &str, default: EntryType) -> ToolResult<EntryType> {
        match self.optional_str(field)? {
            Some(raw) if !raw.trim().is_empty() => Ok(EntryType::from_db_str(raw)?),
            _ => Ok(default),
        }
    }

    /// Assemble a draft from the shared document fields; `body_field` names
    /// the text that becomes the entry's `context`.
    pub fn entry_draft(
        &self,
        body_field: &str,
        default_type: EntryType,
    ) -> ToolResult<EntryDraft> {
        let mut draft = EntryDraft::new(
            self.required_str("title")?,
            self.entry_type_or("entry_type", default_type)?,
            self.required_str(body_field)?,
        );
        draft.id = self.optional_str("id")?.map(str::to_string);
        draft.customer_name = self.str_or_empty("customer_name")?;
        draft.short_summary = self.str_or_empty("short_summary")?;
        draft.project_name = self.str_or_empty("project_name")?;
        draft.tags = Tags::parse(&self.str_or_empty("tags")?);
        draft.reference_url = self.str_or_empty("reference_url")?;
        draft.architecture = self.str_or_empty("architecture")?;
        Ok(draft)
    }
}

fn whole_u64(value: f64) -> Option<u64> {
    (value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64).then_some(value as u64)
}
