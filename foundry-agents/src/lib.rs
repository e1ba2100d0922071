//! Foundry Agents - Invocation Lifecycle
//!
//! Observes remote agent runs through the [`AgentPlatform`] collaborator:
//! - Agent catalogue lookup
//! - Task submission producing an [`InvocationHandle`](foundry_core::InvocationHandle)
//! - Status polling onto the local status taxonomy
//! - Result extraction from the final assistant message

mod client;
mod extractor;
pub mod mock;
mod platform;
mod poller;
mod service;

pub use client::FoundryAgentsClient;
pub use extractor::{extract_result, ResultExtractor};
pub use mock::{MockAgentPlatform, RunScript};
pub use platform::*;
pub use poller::StatusPoller;
pub use service::InvocationService;
