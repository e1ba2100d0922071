//! Tool-call boundary
//!
//! Nine tools over the agent, index and pipeline components. Each takes a
//! flat JSON object and returns a JSON result or a [`ToolError`].
//!
//! [`ToolError`]: crate::error::ToolError

mod args;
pub mod catalog;
mod handlers;
mod types;

pub use args::{validate_tool_input, Args};
pub use catalog::{available_tools, find_tool, DEFAULT_TOP_K};
pub use handlers::{ToolRouter, MAX_REGISTERED_HANDLES};
pub use types::{CallToolRequest, CallToolResponse, ListToolsResponse, Tool};
