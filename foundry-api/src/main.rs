//! `foundry` command-line entry point
//!
//! Loads configuration from the environment, wires the components once and
//! runs a single tool. Results are printed to stdout as JSON; logs go to
//! stderr.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use foundry_api::telemetry::{init_tracing, TelemetryConfig};
use foundry_api::tools::catalog::WORKFLOWS_RUN_PROJECT_LOG_WORKFLOW;
use foundry_api::{
    available_tools, AppState, CallToolResponse, ListToolsResponse, ToolError, ToolRouter,
};
use foundry_core::FoundryConfig;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

#[derive(Debug, Parser)]
#[command(name = "foundry", version, about = "Azure AI Foundry agent and project-log tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the tool catalogue as JSON
    Tools,
    /// Run one tool
    Call {
        /// Tool name, e.g. `search_vector_db`
        tool: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Ingest a customer story into the project log
    Ingest {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        project: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing(&TelemetryConfig::from_env()) {
        eprintln!("failed to initialize tracing: {}", e);
    }

    let cli = Cli::parse();
    let response = match cli.command {
        Command::Tools => {
            return print_json(&ListToolsResponse {
                tools: available_tools(),
            });
        }
        Command::Call { tool, args } => match serde_json::from_str::<JsonValue>(&args) {
            Ok(arguments) => run_tool(&tool, arguments).await,
            Err(e) => Err(ToolError::invalid_argument("--args", e)),
        },
        Command::Ingest { url, project } => {
            run_tool(
                WORKFLOWS_RUN_PROJECT_LOG_WORKFLOW,
                json!({"story_url": url, "project_name": project}),
            )
            .await
        }
    };

    let failed = response.is_err();
    let printed = print_json(&CallToolResponse::from(response));
    if failed {
        ExitCode::FAILURE
    } else {
        printed
    }
}

async fn run_tool(name: &str, arguments: JsonValue) -> Result<JsonValue, ToolError> {
    let config = FoundryConfig::from_env()?;
    let state = AppState::from_config(config)?;
    ToolRouter::new(state).call(name, &arguments).await
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to encode output: {}", e);
            ExitCode::FAILURE
        }
    }
}
