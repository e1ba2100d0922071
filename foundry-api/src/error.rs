//! Error Types for the Tool Boundary
//!
//! Every failure that reaches a tool caller is a [`ToolError`]: a stable
//! machine-readable [`ErrorKind`] plus a human-readable message. Component
//! errors convert without losing their kind.

use foundry_core::{ErrorKind, FoundryError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error returned by every tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Stable category, serialized in snake_case.
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,

    /// Optional additional details (schema violations and the like)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::NotReady | ErrorKind::Transient)
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("unknown tool '{}'", name))
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorKind::InvalidInput,
            format!("missing required argument '{}'", field),
        )
    }

    pub fn invalid_argument(field: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidInput,
            format!("invalid argument '{}': {}", field, reason),
        )
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<FoundryError> for ToolError {
    fn from(err: FoundryError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            ErrorKind::InvalidResponse,
            format!("failed to encode tool result: {}", err),
        )
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
