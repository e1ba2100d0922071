//! Router wiring shared by the scenario tests.

#![allow(dead_code)]

use foundry_api::{AppState, ToolError, ToolRouter};
use foundry_test_utils::Harness;
use serde_json::Value as JsonValue;

/// Router over every harness component.
pub fn router_for(harness: &Harness) -> ToolRouter {
    let state = AppState::new(harness.config.clone())
        .with_agents(harness.invocations.clone())
        .with_index(harness.index.clone())
        .with_pipeline(harness.pipeline());
    ToolRouter::new(state)
}

/// Call a tool that is expected to succeed.
pub async fn call_ok(router: &ToolRouter, tool: &str, args: JsonValue) -> JsonValue {
    match router.call(tool, &args).await {
        Ok(value) => value,
        Err(e) => panic!("{} failed: {}", tool, e),
    }
}

/// Call a tool that is expected to fail.
pub async fn call_err(router: &ToolRouter, tool: &str, args: JsonValue) -> ToolError {
    match router.call(tool, &args).await {
        Ok(value) => panic!("{} unexpectedly succeeded: {}", tool, value),
        Err(e) => e,
    }
}
