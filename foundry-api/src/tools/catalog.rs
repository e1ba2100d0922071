//! Tool definitions

use super::types::Tool;
use foundry_storage::MAX_TOP_K;
use serde_json::json;

pub const AGENTS_LIST_AGENTS: &str = "agents_list_agents";
pub const AGENTS_INVOKE_AGENT: &str = "agents_invoke_agent";
pub const AGENTS_GET_INVOCATION_STATUS: &str = "agents_get_invocation_status";
pub const AGENTS_GET_INVOCATION_RESULT: &str = "agents_get_invocation_result";
pub const SEARCH_VECTOR_DB: &str = "search_vector_db";
pub const SEARCH_ADD_TO_VECTOR_DB: &str = "search_add_to_vector_db";
pub const INDEX_CREATE_PROJECT_LOG_INDEX: &str = "index_create_project_log_index";
pub const INDEX_INGEST_PROJECT_LOG: &str = "index_ingest_project_log";
pub const WORKFLOWS_RUN_PROJECT_LOG_WORKFLOW: &str = "workflows_run_project_log_workflow";

/// Default number of hits for [`SEARCH_VECTOR_DB`].
pub const DEFAULT_TOP_K: usize = 5;

const ENTRY_TYPES: [&str; 4] = ["workshop", "meeting", "blog", "repo"];

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Properties shared by the two document-writing tools.
fn entry_properties(body_field: &str, body_description: &str) -> serde_json::Value {
    let entry_type_description = format!(
        "Kind of entry, one of {} (case-insensitive)",
        ENTRY_TYPES.join(", ")
    );
    json!({
        "id": {
            "type": "string",
            "description": "Existing document id to overwrite; a new id is assigned when omitted"
        },
        "title": {"type": "string", "description": "Entry title"},
        "entry_type": {
            "type": "string",
            "description": entry_type_description
        },
        "customer_name": {"type": "string", "description": "Customer organization"},
        "short_summary": {"type": "string", "description": "One or two sentence summary"},
        body_field: {"type": "string", "description": body_description},
        "project_name": {"type": "string", "description": "Project the entry belongs to"},
        "tags": {"type": "string", "description": "Comma-separated tags"},
        "reference_url": {"type": "string", "description": "Source URL"},
        "architecture": {"type": "string", "description": "Architecture description (JSON text)"}
    })
}

/// Every tool this process serves, in catalogue order.
pub fn available_tools() -> Vec<Tool> {
    vec![
        // Agent tools
        tool(
            AGENTS_LIST_AGENTS,
            "List the agents deployed in the AI Foundry project",
            json!({"type": "object", "properties": {}}),
        ),
        tool(
            AGENTS_INVOKE_AGENT,
            "Submit a task to a deployed agent and return an invocation id to poll",
            json!({
                "type": "object",
                "properties": {
                    "agent_id": {"type": "string", "description": "Agent id from agents_list_agents"},
                    "task": {"type": "string", "description": "Task or question for the agent"},
                    "file_context": {"type": "string", "description": "Optional extra context appended to the task"}
                },
                "required": ["agent_id", "task"]
            }),
        ),
        tool(
            AGENTS_GET_INVOCATION_STATUS,
            "Get the current status of an agent invocation",
            json!({
                "type": "object",
                "properties": {
                    "invocation_id": {"type": "string", "description": "Id returned by agents_invoke_agent"}
                },
                "required": ["invocation_id"]
            }),
        ),
        tool(
            AGENTS_GET_INVOCATION_RESULT,
            "Get the final output of a completed agent invocation",
            json!({
                "type": "object",
                "properties": {
                    "invocation_id": {"type": "string", "description": "Id returned by agents_invoke_agent"}
                },
                "required": ["invocation_id"]
            }),
        ),
        // Search tools
        tool(
            SEARCH_VECTOR_DB,
            "Semantic search over the project log index",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Natural language query"},
                    "top_k": {
                        "type": ["integer", "string"],
                        "pattern": "^[0-9]+$",
                        "minimum": 1,
                        "maximum": MAX_TOP_K,
                        "default": DEFAULT_TOP_K,
                        "description": "Number of results to return"
                    }
                },
                "required": ["query"]
            }),
        ),
        tool(
            SEARCH_ADD_TO_VECTOR_DB,
            "Embed a document and add it to the project log index",
            json!({
                "type": "object",
                "properties": entry_properties("content", "Document body; this text is embedded"),
                "required": ["title", "content"]
            }),
        ),
        // Index tools
        tool(
            INDEX_CREATE_PROJECT_LOG_INDEX,
            "Create the project log index if it does not exist",
            json!({"type": "object", "properties": {}}),
        ),
        tool(
            INDEX_INGEST_PROJECT_LOG,
            "Write a fully described project log entry to the index",
            json!({
                "type": "object",
                "properties": entry_properties("context", "Detailed description; this text is embedded"),
                "required": ["title", "entry_type", "customer_name", "short_summary", "context"]
            }),
        ),
        // Workflow tools
        tool(
            WORKFLOWS_RUN_PROJECT_LOG_WORKFLOW,
            "Fetch a customer story, extract a case study and architecture, and store it as a project log entry",
            json!({
                "type": "object",
                "properties": {
                    "story_url": {"type": "string", "description": "URL of a customer success story"},
                    "project_name": {"type": "string", "description": "Optional project name for the entry"}
                },
                "required": ["story_url"]
            }),
        ),
    ]
}

pub fn find_tool(name: &str) -> Option<Tool> {
    available_tools().into_iter().find(|t| t.name == name)
}
