//! Foundry API - Tool-Call Boundary
//!
//! Exposes the agent, index and ingest components as named tools taking a
//! flat JSON object. Every failure surfaces as a [`ToolError`] carrying a
//! stable kind. Transport framing is left to the caller; the `foundry`
//! binary drives the router from the command line.

pub mod error;
pub mod state;
pub mod telemetry;
pub mod tools;

pub use error::{ToolError, ToolResult};
pub use state::AppState;
pub use tools::{
    available_tools, CallToolRequest, CallToolResponse, ListToolsResponse, Tool, ToolRouter,
};
