/// Swarmflow: graph-based workflow execution engine
///
/// Main entry point for the Swarmflow server. Loads configuration from the
/// environment and starts the HTTP server.

use swarmflow::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Workflow execution at POST /api/run-workflow
/// - Workflow management at /api/save-workflow and /api/workflows/*
/// - Capability metadata at /api/node-types
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
