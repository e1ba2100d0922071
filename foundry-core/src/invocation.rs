//! Invocation lifecycle types: handle, status taxonomy and result payload.

use crate::{FoundryError, FoundryResult, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Separator between thread and run ids inside an invocation id.
pub const INVOCATION_ID_SEPARATOR: &str = "::";

// ============================================================================
// INVOCATION HANDLE
// ============================================================================

/// Remote coordinates of one run: the conversation thread and the run in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunRef {
    pub thread_id: String,
    pub run_id: String,
}

impl RunRef {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        }
    }

    /// Wire form `<thread_id>::<run_id>`.
    pub fn invocation_id(&self) -> String {
        format!("{}{}{}", self.thread_id, INVOCATION_ID_SEPARATOR, self.run_id)
    }

    /// Parse the wire form produced by [`RunRef::invocation_id`].
    ///
    /// Both ids become REST path segments, so each is limited to ASCII
    /// letters, digits, `_` and `-`.
    pub fn parse(invocation_id: &str) -> FoundryResult<Self> {
        let parts: Vec<&str> = invocation_id.split(INVOCATION_ID_SEPARATOR).collect();
        match parts.as_slice() {
            [thread_id, run_id] if is_path_safe_id(thread_id) && is_path_safe_id(run_id) => {
                Ok(Self::new(*thread_id, *run_id))
            }
            _ => Err(FoundryError::invalid_input(
                "invocation_id",
                format!(
                    "'{}' is not of the form '<thread_id>::<run_id>'",
                    invocation_id
                ),
            )),
        }
    }
}

fn is_path_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Correlates one submitted task with the remote run executing it.
///
/// Handles are immutable and identify the run for every later status or
/// result query. A handle belongs to exactly one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationHandle {
    pub invocation_id: String,
    pub agent_id: String,
    pub submitted_at: Timestamp,
}

impl InvocationHandle {
    /// Create a handle for a run that was just submitted.
    pub fn new(agent_id: impl Into<String>, run: &RunRef) -> Self {
        Self {
            invocation_id: run.invocation_id(),
            agent_id: agent_id.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Rebuild a handle for an id issued by another process.
    ///
    /// The agent is unknown and `submitted_at` is the time of recovery.
    pub fn detached(invocation_id: &str) -> FoundryResult<Self> {
        let run = RunRef::parse(invocation_id)?;
        Ok(Self {
            invocation_id: run.invocation_id(),
            agent_id: String::new(),
            submitted_at: Utc::now(),
        })
    }

    pub fn run_ref(&self) -> FoundryResult<RunRef> {
        RunRef::parse(&self.invocation_id)
    }
}

// ============================================================================
// INVOCATION STATUS
// ============================================================================

/// Closed local status taxonomy.
///
/// The string forms are an external contract; changing them requires a
/// version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
}

/// Native status names (lowercase) and the local status each resolves to.
///
/// Includes spelling variants used by different platform API versions.
pub const NATIVE_STATUS_TABLE: &[(&str, InvocationStatus)] = &[
    ("queued", InvocationStatus::Queued),
    ("pending", InvocationStatus::Queued),
    ("in_progress", InvocationStatus::InProgress),
    ("running", InvocationStatus::InProgress),
    ("requires_action", InvocationStatus::RequiresAction),
    ("cancelling", InvocationStatus::Cancelling),
    ("canceling", InvocationStatus::Cancelling),
    ("cancelled", InvocationStatus::Cancelled),
    ("canceled", InvocationStatus::Cancelled),
    ("failed", InvocationStatus::Failed),
    ("incomplete", InvocationStatus::Failed),
    ("completed", InvocationStatus::Completed),
    ("succeeded", InvocationStatus::Completed),
    ("expired", InvocationStatus::Expired),
];

impl InvocationStatus {
    pub const ALL: [InvocationStatus; 8] = [
        Self::Queued,
        Self::InProgress,
        Self::RequiresAction,
        Self::Cancelling,
        Self::Cancelled,
        Self::Failed,
        Self::Completed,
        Self::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    /// Resolve a native platform status through [`NATIVE_STATUS_TABLE`].
    ///
    /// Unknown values are surfaced as `Transient` instead of being coerced to
    /// a guessed state, so a caller re-polls rather than acting on it.
    pub fn from_native(native: &str) -> FoundryResult<Self> {
        let normalized = native.trim().to_ascii_lowercase();
        NATIVE_STATUS_TABLE
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, status)| *status)
            .ok_or_else(|| {
                FoundryError::transient(
                    "status mapping",
                    format!("unrecognized native status '{}'", native),
                )
            })
    }

    /// Terminal states are never observed to transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }

    /// Whether `next` is a legal observation after `self`.
    ///
    /// Polls may skip intermediate states, so any forward move is allowed.
    /// Staying put is always allowed.
    pub fn can_transition_to(&self, next: InvocationStatus) -> bool {
        use InvocationStatus::*;
        if *self == next {
            return true;
        }
        match self {
            Queued => !matches!(next, Queued),
            InProgress => !matches!(next, Queued),
            RequiresAction => !matches!(next, Queued),
            Cancelling => matches!(next, Cancelled),
            Cancelled | Failed | Completed | Expired => false,
        }
    }
}

impl std::fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvocationStatus {
    type Err = FoundryError;

    /// Parses the local wire form only (not native aliases).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                FoundryError::invalid_input("status", format!("unknown status '{}'", s))
            })
    }
}

// ============================================================================
// INVOCATION RESULT
// ============================================================================

/// Normalized output of a completed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Text segments of the final assistant message joined with newlines.
    pub text: String,
    /// Opaque file ids in the order the platform reported them.
    pub file_references: Vec<String>,
}

impl InvocationResult {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.file_references.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
