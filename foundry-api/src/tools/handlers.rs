//! Tool dispatch
//!
//! [`ToolRouter`] validates arguments against the catalogue schema, calls the
//! component behind the tool and shapes its output as JSON.

use super::args::{validate_tool_input, Args};
use super::catalog::{self, available_tools, find_tool, DEFAULT_TOP_K};
use super::types::{CallToolRequest, CallToolResponse, Tool};
use crate::error::{ToolError, ToolResult};
use crate::state::AppState;
use foundry_agents::InvocationService;
use foundry_core::{EntryType, ErrorKind, FoundryError, InvocationHandle, ProjectLogEntry};
use foundry_pipeline::IngestPipeline;
use foundry_storage::{ProjectLogIndex, SchemaStatus};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Handles kept for status queries; the oldest submission is dropped first.
pub const MAX_REGISTERED_HANDLES: usize = 1024;

type HandleMap = HashMap<String, InvocationHandle>;

/// Serves tool calls against one [`AppState`].
///
/// Handles issued by `agents_invoke_agent` are remembered so later status
/// queries can report the submitting agent and submission time. A handle is
/// forgotten once its terminal result has been fetched.
pub struct ToolRouter {
    state: AppState,
    handles: RwLock<HandleMap>,
}

impl ToolRouter {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            handles: RwLock::new(HashMap::new()),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn tools(&self) -> Vec<Tool> {
        available_tools()
    }

    /// Run one request, folding any failure into the response.
    pub async fn handle(&self, request: CallToolRequest) -> CallToolResponse {
        self.call(&request.name, &request.arguments).await.into()
    }

    /// Run one tool by name.
    pub async fn call(&self, name: &str, arguments: &JsonValue) -> ToolResult<JsonValue> {
        let tool = find_tool(name).ok_or_else(|| ToolError::unknown_tool(name))?;
        let empty = json!({});
        let input = if arguments.is_null() { &empty } else { arguments };
        validate_tool_input(input, &tool.input_schema)?;
        let args = Args::new(input)?;

        debug!(tool = name, "Calling tool");
        let result = match name {
            catalog::AGENTS_LIST_AGENTS => self.list_agents().await,
            catalog::AGENTS_INVOKE_AGENT => self.invoke_agent(args).await,
            catalog::AGENTS_GET_INVOCATION_STATUS => self.invocation_status(args).await,
            catalog::AGENTS_GET_INVOCATION_RESULT => self.invocation_result(args).await,
            catalog::SEARCH_VECTOR_DB => self.search(args).await,
            catalog::SEARCH_ADD_TO_VECTOR_DB => self.add_document(args).await,
            catalog::INDEX_CREATE_PROJECT_LOG_INDEX => self.create_index().await,
            catalog::INDEX_INGEST_PROJECT_LOG => self.ingest_entry(args).await,
            catalog::WORKFLOWS_RUN_PROJECT_LOG_WORKFLOW => self.run_workflow(args).await,
            _ => Err(ToolError::unknown_tool(name)),
        };

        if let Err(e) = &result {
            warn!(tool = name, kind = %e.kind, error = %e.message, "Tool call failed");
        }
        result
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    fn invocations(&self) -> ToolResult<&InvocationService> {
        self.state
            .invocations
            .as_ref()
            .ok_or_else(|| FoundryError::missing_config("AZURE_AI_PROJECT_ENDPOINT").into())
    }

    fn index(&self) -> ToolResult<&ProjectLogIndex> {
        self.state
            .index
            .as_deref()
            .ok_or_else(|| FoundryError::missing_config("AZURE_AI_SEARCH_ENDPOINT").into())
    }

    fn pipeline(&self) -> ToolResult<&IngestPipeline> {
        self.state
            .pipeline
            .as_deref()
            .ok_or_else(|| FoundryError::missing_config("AZURE_AI_SEARCH_ENDPOINT").into())
    }

    // ========================================================================
    // Handle registry
    // ========================================================================

    fn read_handles(&self) -> ToolResult<RwLockReadGuard<'_, HandleMap>> {
        self.handles
            .read()
            .map_err(|_| FoundryError::transient("handle_registry", "lock poisoned").into())
    }

    fn write_handles(&self) -> ToolResult<RwLockWriteGuard<'_, HandleMap>> {
        self.handles
            .write()
            .map_err(|_| FoundryError::transient("handle_registry", "lock poisoned").into())
    }

    /// Number of handles currently remembered.
    pub fn registered_handles(&self) -> ToolResult<usize> {
        Ok(self.read_handles()?.len())
    }

    /// The registered handle for `invocation_id`, else a detached one.
    fn resolve_handle(&self, invocation_id: &str) -> ToolResult<(InvocationHandle, bool)> {
        let registered = self.read_handles()?.get(invocation_id).cloned();
        match registered {
            Some(handle) => Ok((handle, true)),
            None => Ok((InvocationHandle::detached(invocation_id)?, false)),
        }
    }

    fn remember(&self, handle: &InvocationHandle) -> ToolResult<()> {
        let mut handles = self.write_handles()?;
        if handles.len() >= MAX_REGISTERED_HANDLES && !handles.contains_key(&handle.invocation_id) {
            let oldest = handles
                .values()
                .min_by_key(|h| h.submitted_at)
                .map(|h| h.invocation_id.clone());
            if let Some(oldest) = oldest {
                debug!(invocation_id = %oldest, "Handle registry full, dropping oldest");
                handles.remove(&oldest);
            }
        }
        handles.insert(handle.invocation_id.clone(), handle.clone());
        Ok(())
    }

    fn forget(&self, invocation_id: &str) -> ToolResult<()> {
        self.write_handles()?.remove(invocation_id);
        Ok(())
    }

    // ========================================================================
    // Agent tools
    // ========================================================================

    async fn list_agents(&self) -> ToolResult<JsonValue> {
        let agents = self.invocations()?.list_agents().await?;
        Ok(json!({
            "count": agents.len(),
            "agents": agents,
        }))
    }

    async fn invoke_agent(&self, args: Args<'_>) -> ToolResult<JsonValue> {
        let agent_id = args.required_str("agent_id")?;
        let task = args.required_str("task")?;
        let file_context = args.optional_str("file_context")?;

        let handle = self
            .invocations()?
            .submit(agent_id, task, file_context)
            .await?;
        self.remember(&handle)?;
        Ok(serde_json::to_value(&handle)?)
    }

    async fn invocation_status(&self, args: Args<'_>) -> ToolResult<JsonValue> {
        let service = self.invocations()?;
        let (handle, registered) = self.resolve_handle(args.required_str("invocation_id")?)?;
        let status = service.get_status(&handle).await?;

        let agent_id = if registered {
            JsonValue::from(handle.agent_id.as_str())
        } else {
            JsonValue::Null
        };
        let mut body = json!({
            "invocation_id": handle.invocation_id,
            "agent_id": agent_id,
            "status": status,
            "is_terminal": status.is_terminal(),
        });
        if registered {
            body["submitted_at"] = serde_json::to_value(handle.submitted_at)?;
        }
        Ok(body)
    }

    async fn invocation_result(&self, args: Args<'_>) -> ToolResult<JsonValue> {
        let service = self.invocations()?;
        let (handle, registered) = self.resolve_handle(args.required_str("invocation_id")?)?;
        let result = service.get_result(&handle).await;

        // Both outcomes are final for the run; `NotReady` keeps the handle.
        let settled = match &result {
            Ok(_) => true,
            Err(e) => e.kind() == ErrorKind::InvocationFailed,
        };
        if registered && settled {
            self.forget(&handle.invocation_id)?;
        }

        let result = result?;
        Ok(json!({
            "invocation_id": handle.invocation_id,
            "text": result.text,
            "file_references": result.file_references,
        }))
    }

    // ========================================================================
    // Search and index tools
    // ========================================================================

    async fn search(&self, args: Args<'_>) -> ToolResult<JsonValue> {
        let query = args.required_str("query")?;
        let top_k = args.usize_or("top_k", DEFAULT_TOP_K)?;

        let hits = self.index()?.search(query, top_k).await?;
        let results = hits
            .into_iter()
            .map(|hit| {
                let mut value = entry_json(hit.entry)?;
                value["score"] = JsonValue::from(hit.score);
                Ok(value)
            })
            .collect::<ToolResult<Vec<_>>>()?;

        Ok(json!({
            "query": query,
            "count": results.len(),
            "results": results,
        }))
    }

    async fn add_document(&self, args: Args<'_>) -> ToolResult<JsonValue> {
        let index = self.index()?;
        let draft = args.entry_draft("content", EntryType::Meeting)?;
        let entry = index.upsert(draft).await?;
        Ok(json!({
            "index": index.name(),
            "entry": entry_json(entry)?,
        }))
    }

    async fn create_index(&self) -> ToolResult<JsonValue> {
        let index = self.index()?;
        let status = index.ensure_schema().await?;
        let schema = index.schema();
        let status = match status {
            SchemaStatus::Created => "created",
            SchemaStatus::Existing => "existing",
        };
        Ok(json!({
            "index": index.name(),
            "status": status,
            "dimensions": schema.vector_dimensions(),
            "fields": schema.field_names(),
        }))
    }

    async fn ingest_entry(&self, args: Args<'_>) -> ToolResult<JsonValue> {
        let index = self.index()?;
        let draft = args.entry_draft("context", EntryType::Blog)?;
        let entry = index.upsert(draft).await?;
        Ok(json!({
            "index": index.name(),
            "entry": entry_json(entry)?,
        }))
    }

    // ========================================================================
    // Workflow tools
    // ========================================================================

    async fn run_workflow(&self, args: Args<'_>) -> ToolResult<JsonValue> {
        let story_url = args.required_str("story_url")?;
        let project_name = args.str_or_empty("project_name")?;
        let report = self.pipeline()?.run(story_url, &project_name).await?;
        Ok(serde_json::to_value(report)?)
    }
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered = self.handles.read().map(|h| h.len()).unwrap_or_default();
        f.debug_struct("ToolRouter")
            .field("state", &self.state)
            .field("registered_handles", &registered)
            .finish()
    }
}

/// Stored entries are returned without their vector.
fn entry_json(entry: ProjectLogEntry) -> ToolResult<JsonValue> {
    Ok(serde_json::to_value(entry.without_vector())?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_core::{FoundryConfig, RunRef, Timestamp};

    fn bare_router() -> ToolRouter {
        ToolRouter::new(AppState::new(FoundryConfig::default()))
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let err = bare_router().call("trajectory_list", &json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_schema_violation_is_rejected_before_dispatch() {
        let err = bare_router()
            .call(catalog::SEARCH_VECTOR_DB, &json!({"top_k": 3}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
        assert!(err.details.is_some());
    }

    #[tokio::test]
    async fn test_unconfigured_collaborators_are_config_errors() {
        let router = bare_router();
        let err = router
            .call(catalog::AGENTS_LIST_AGENTS, &JsonValue::Null)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("AZURE_AI_PROJECT_ENDPOINT"));

        let err = router
            .call(catalog::SEARCH_VECTOR_DB, &json!({"query": "aks"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("AZURE_AI_SEARCH_ENDPOINT"));
    }

    #[test]
    fn test_registry_is_capped_dropping_oldest() {
        let router = bare_router();
        let mut first = InvocationHandle::new("asst", &RunRef::new("thread_first", "run_first"));
        first.submitted_at = Timestamp::MIN_UTC;
        router.remember(&first).unwrap();
        for n in 0..MAX_REGISTERED_HANDLES {
            let handle =
                InvocationHandle::new("asst", &RunRef::new(format!("thread_{n}"), format!("run_{n}")));
            router.remember(&handle).unwrap();
        }

        assert_eq!(router.registered_handles().unwrap(), MAX_REGISTERED_HANDLES);
        let (_, registered) = router.resolve_handle(&first.invocation_id).unwrap();
        assert!(!registered);
        let (_, registered) = router.resolve_handle("thread_0::run_0").unwrap();
        assert!(registered);
    }

    #[test]
    fn test_poisoned_registry_is_an_error_not_a_silent_skip() {
        let router = bare_router();
        std::thread::scope(|scope| {
            let poisoner = scope.spawn(|| {
                let _guard = router.handles.write().unwrap();
                panic!("poison the registry");
            });
            assert!(poisoner.join().is_err());
        });

        let handle = InvocationHandle::new("asst", &RunRef::new("t", "r"));
        let err = router.remember(&handle).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transient);
        assert!(err.message.contains("lock poisoned"));
        assert!(router.resolve_handle("t::r").is_err());
    }

    #[tokio::test]
    async fn test_handle_folds_errors_into_response() {
        let response = bare_router()
            .handle(CallToolRequest {
                name: "nope".to_string(),
                arguments: JsonValue::Null,
            })
            .await;
        assert!(response.is_error());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["kind"], "not_found");
    }
}
