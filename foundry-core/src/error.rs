//! Error types for Foundry operations

use crate::InvocationStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Embedding dimension mismatch: configured {expected}, provider returned {got}")]
    DimensionMismatch { expected: i32, got: i32 },
}

/// Master error type for all Foundry errors.
///
/// Every variant maps to exactly one [`ErrorKind`], which is the stable,
/// machine-readable code surfaced at the tool-call boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FoundryError {
    /// Unknown handle, run, agent, document or index.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The invocation exists but has not reached a terminal state.
    #[error("Invocation {invocation_id} is not complete yet (status: {status})")]
    NotReady {
        invocation_id: String,
        status: InvocationStatus,
    },

    /// Network failure, timeout or throttling talking to a remote service.
    #[error("Transient failure during {operation}: {reason}")]
    Transient { operation: String, reason: String },

    /// The remote run ended in `failed`, `cancelled` or `expired`.
    #[error("Invocation {invocation_id} ended with status {status}: {diagnostic}")]
    InvocationFailed {
        invocation_id: String,
        status: InvocationStatus,
        diagnostic: String,
    },

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Input too large: {length} characters exceeds the limit of {limit}")]
    InputTooLarge { length: usize, limit: usize },

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Index {index} is incompatible with the required schema: {reason}")]
    SchemaMismatch { index: String, reason: String },

    /// The remote answered, but with a payload that cannot be used.
    #[error("Invalid response from {source_name}: {reason}")]
    InvalidResponse { source_name: String, reason: String },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Foundry operations.
pub type FoundryResult<T> = Result<T, FoundryError>;

// ============================================================================
// ERROR KIND
// ============================================================================

/// Stable machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NotReady,
    Transient,
    InvocationFailed,
    InvalidInput,
    InputTooLarge,
    FetchFailed,
    SchemaMismatch,
    InvalidResponse,
    Config,
}

impl ErrorKind {
    /// Wire representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NotReady => "not_ready",
            Self::Transient => "transient",
            Self::InvocationFailed => "invocation_failed",
            Self::InvalidInput => "invalid_input",
            Self::InputTooLarge => "input_too_large",
            Self::FetchFailed => "fetch_failed",
            Self::SchemaMismatch => "schema_mismatch",
            Self::InvalidResponse => "invalid_response",
            Self::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FoundryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotReady { .. } => ErrorKind::NotReady,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::InvocationFailed { .. } => ErrorKind::InvocationFailed,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InputTooLarge { .. } => ErrorKind::InputTooLarge,
            Self::Fetch { .. } => ErrorKind::FetchFailed,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the same request may succeed later without changing its input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady { .. } | Self::Transient { .. })
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn transient(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transient {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_response(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidResponse {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_config(field: impl Into<String>) -> Self {
        Self::Config(ConfigError::MissingRequired {
            field: field.into(),
        })
    }

    /// Classify a non-success HTTP status from a remote service.
    ///
    /// 408, 429 and 5xx are retryable; 404 names the missing resource;
    /// any other 4xx means the request itself was rejected.
    pub fn from_http_status(service: &str, status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::not_found(format!("{}: {}", service, message)),
            408 | 429 | 500..=599 => {
                Self::transient(service, format!("HTTP {}: {}", status, message))
            }
            400..=499 => Self::invalid_input(service, format!("HTTP {}: {}", status, message)),
            _ => Self::invalid_response(service, format!("unexpected HTTP {}: {}", status, message)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_display_includes_status() {
        let err = FoundryError::NotReady {
            invocation_id: "thread_1::run_1".to_string(),
            status: InvocationStatus::InProgress,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("thread_1::run_1"));
        assert!(msg.contains("in_progress"));
    }

    #[test]
    fn test_invocation_failed_display_carries_diagnostic() {
        let err = FoundryError::InvocationFailed {
            invocation_id: "t::r".to_string(),
            status: InvocationStatus::Failed,
            diagnostic: "rate limit exceeded".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("failed"));
        assert!(msg.contains("rate limit exceeded"));
    }

    #[test]
    fn test_config_error_display_dimension_mismatch() {
        let err = ConfigError::DimensionMismatch {
            expected: 1536,
            got: 768,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1536"));
        assert!(msg.contains("768"));
    }

    #[test]
    fn test_kind_codes_are_stable() {
        let cases = [
            (FoundryError::not_found("run"), "not_found"),
            (FoundryError::transient("poll", "timeout"), "transient"),
            (FoundryError::invalid_input("task", "empty"), "invalid_input"),
            (
                FoundryError::InputTooLarge {
                    length: 10,
                    limit: 5,
                },
                "input_too_large",
            ),
            (
                FoundryError::Fetch {
                    url: "https://example.com".to_string(),
                    reason: "404".to_string(),
                },
                "fetch_failed",
            ),
            (
                FoundryError::SchemaMismatch {
                    index: "idx".to_string(),
                    reason: "dims".to_string(),
                },
                "schema_mismatch",
            ),
            (FoundryError::invalid_response("openai", "bad json"), "invalid_response"),
            (FoundryError::missing_config("AZURE_AI_SEARCH_ENDPOINT"), "config"),
        ];
        for (err, code) in cases {
            assert_eq!(err.kind().as_str(), code);
        }
    }

    #[test]
    fn test_error_kind_serializes_as_code() {
        let json = serde_json::to_string(&ErrorKind::InvocationFailed).unwrap();
        assert_eq!(json, "\"invocation_failed\"");
    }

    #[test]
    fn test_only_not_ready_and_transient_are_retryable() {
        assert!(FoundryError::transient("embed", "reset").is_retryable());
        assert!(FoundryError::NotReady {
            invocation_id: "t::r".to_string(),
            status: InvocationStatus::Queued,
        }
        .is_retryable());
        assert!(!FoundryError::not_found("x").is_retryable());
        assert!(!FoundryError::InvocationFailed {
            invocation_id: "t::r".to_string(),
            status: InvocationStatus::Expired,
            diagnostic: String::new(),
        }
        .is_retryable());
        assert!(!FoundryError::missing_config("x").is_retryable());
    }

    #[test]
    fn test_http_status_classification() {
        let kind = |status| FoundryError::from_http_status("search", status, "body").kind();
        assert_eq!(kind(404), ErrorKind::NotFound);
        assert_eq!(kind(408), ErrorKind::Transient);
        assert_eq!(kind(429), ErrorKind::Transient);
        assert_eq!(kind(503), ErrorKind::Transient);
        assert_eq!(kind(400), ErrorKind::InvalidInput);
        assert_eq!(kind(409), ErrorKind::InvalidInput);
        assert_eq!(kind(302), ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_config_error_converts_into_foundry_error() {
        let err = FoundryError::from(ConfigError::MissingRequired {
            field: "AZURE_OPENAI_COMPLETION_MODEL_NAME".to_string(),
        });
        assert!(matches!(err, FoundryError::Config(_)));
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
