//! Normalizes run output into an [`InvocationResult`].

use crate::platform::{AgentPlatform, NativeContent, NativeOutput, NativeRun};
use foundry_core::{FoundryError, FoundryResult, InvocationHandle, InvocationResult, InvocationStatus};
use std::sync::Arc;
use tracing::debug;

/// Reads results of terminal runs.
#[derive(Clone)]
pub struct ResultExtractor {
    platform: Arc<dyn AgentPlatform>,
}

impl ResultExtractor {
    pub fn new(platform: Arc<dyn AgentPlatform>) -> Self {
        Self { platform }
    }

    /// Result of a completed invocation.
    ///
    /// # Errors
    /// - `NotReady` while the run is not terminal
    /// - `InvocationFailed` for `failed`, `cancelled` and `expired` runs
    /// - `InvalidResponse` if a completed run has no assistant message
    pub async fn get_result(&self, handle: &InvocationHandle) -> FoundryResult<InvocationResult> {
        let run = handle.run_ref()?;
        let native = self.platform.fetch_status(&run).await?;
        let status = InvocationStatus::from_native(&native.status)?;

        match status {
            InvocationStatus::Completed => {
                let output = self.platform.fetch_output(&run).await?;
                let result = extract_result(&output).ok_or_else(|| {
                    FoundryError::invalid_response(
                        "agents",
                        format!(
                            "completed invocation {} has no assistant message",
                            handle.invocation_id
                        ),
                    )
                })?;
                debug!(
                    invocation_id = %handle.invocation_id,
                    files = result.file_references.len(),
                    "Extracted invocation result"
                );
                Ok(result)
            }
            InvocationStatus::Failed | InvocationStatus::Cancelled | InvocationStatus::Expired => {
                Err(FoundryError::InvocationFailed {
                    invocation_id: handle.invocation_id.clone(),
                    status,
                    diagnostic: diagnostic(status, &native),
                })
            }
            _ => Err(FoundryError::NotReady {
                invocation_id: handle.invocation_id.clone(),
                status,
            }),
        }
    }
}

/// Best-available explanation for a run that did not complete.
fn diagnostic(status: InvocationStatus, native: &NativeRun) -> String {
    if let Some(message) = &native.last_error {
        return message.clone();
    }
    match status {
        InvocationStatus::Cancelled => "run was cancelled".to_string(),
        InvocationStatus::Expired => "run expired before completing".to_string(),
        _ => "unknown error".to_string(),
    }
}

/// Build a result from the most recent assistant message, if there is one.
///
/// Text parts are joined with newlines. Image parts and text annotations
/// contribute file references in reported order, each id once.
pub fn extract_result(output: &NativeOutput) -> Option<InvocationResult> {
    let message = output.messages.iter().find(|m| m.is_assistant())?;

    let mut texts = Vec::new();
    let mut file_references: Vec<String> = Vec::new();
    let mut push_file = |id: &str| {
        if !file_references.iter().any(|f| f == id) {
            file_references.push(id.to_string());
        }
    };

    for part in &message.content {
        match part {
            NativeContent::Text { value, file_ids } => {
                texts.push(value.as_str());
                for id in file_ids {
                    push_file(id);
                }
            }
            NativeContent::ImageFile { file_id } => push_file(file_id),
        }
    }

    Some(InvocationResult {
        text: texts.join("\n"),
        file_references,
    })
}

// =============================================================================
// TESTS
// =============================================================================
