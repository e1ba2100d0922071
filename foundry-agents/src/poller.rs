//! Status polling onto the local [`InvocationStatus`] taxonomy.

use crate::platform::AgentPlatform;
use foundry_core::{FoundryError, FoundryResult, InvocationHandle, InvocationStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Observes remote runs. Holds no per-handle state, so any number of
/// handles can be polled concurrently through one poller.
#[derive(Clone)]
pub struct StatusPoller {
    platform: Arc<dyn AgentPlatform>,
    poll_interval: Duration,
}

impl StatusPoller {
    pub fn new(platform: Arc<dyn AgentPlatform>, poll_interval: Duration) -> Self {
        Self {
            platform,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Current status of the run behind `handle`.
    ///
    /// # Errors
    /// - `InvalidInput` if the handle's id is malformed
    /// - `NotFound` if the platform does not know the run
    /// - `Transient` on connectivity failure or an unrecognized native status
    pub async fn get_status(&self, handle: &InvocationHandle) -> FoundryResult<InvocationStatus> {
        let run = handle.run_ref()?;
        let native = self.platform.fetch_status(&run).await?;
        InvocationStatus::from_native(&native.status)
    }

    /// Poll until the run reaches a terminal status or `timeout` elapses.
    ///
    /// Errors from an individual poll end the wait immediately. Running out
    /// of time is reported as `Transient`, so callers may wait again.
    pub async fn await_terminal(
        &self,
        handle: &InvocationHandle,
        timeout: Duration,
    ) -> FoundryResult<InvocationStatus> {
        match tokio::time::timeout(timeout, self.poll_until_terminal(handle)).await {
            Ok(result) => result,
            Err(_) => Err(FoundryError::transient(
                "await_terminal",
                format!(
                    "invocation {} not terminal after {}ms",
                    handle.invocation_id,
                    timeout.as_millis()
                ),
            )),
        }
    }

    async fn poll_until_terminal(&self, handle: &InvocationHandle) -> FoundryResult<InvocationStatus> {
        let mut previous: Option<InvocationStatus> = None;
        let mut polls = 0u32;

        loop {
            let status = self.get_status(handle).await?;
            polls += 1;

            if let Some(prev) = previous {
                if !prev.can_transition_to(status) {
                    warn!(
                        invocation_id = %handle.invocation_id,
                        from = %prev,
                        to = %status,
                        "Unexpected status transition"
                    );
                }
            }
            debug!(invocation_id = %handle.invocation_id, status = %status, polls, "Polled invocation");

            if status.is_terminal() {
                return Ok(status);
            }
            previous = Some(status);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl std::fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPoller")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
