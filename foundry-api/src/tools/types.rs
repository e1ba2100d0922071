//! Tool boundary types

use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema for input parameters
    pub input_schema: JsonValue,
}

/// List tools response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResponse {
    pub tools: Vec<Tool>,
}

/// Tool call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: JsonValue,
}

/// Tool call response: the structured result, or the error with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallToolResponse {
    Ok { result: JsonValue },
    Err { error: ToolError },
}

impl CallToolResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, CallToolResponse::Err { .. })
    }
}

impl From<Result<JsonValue, ToolError>> for CallToolResponse {
    fn from(result: Result<JsonValue, ToolError>) -> Self {
        match result {
            Ok(result) => CallToolResponse::Ok { result },
            Err(error) => CallToolResponse::Err { error },
        }
    }
}
