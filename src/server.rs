/// Server setup and initialization
///
/// Wires together storage, the capability registry, the execution engine
/// and the HTTP routes, and provides the application factory used by both
/// the binary and the tests.

use crate::{
    api::{create_node_routes, create_workflow_routes, AppState},
    config::Config,
    engine::WorkflowEngine,
    nodes::CapabilityRegistry,
    workflow::storage::WorkflowStorage,
};
use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Create the Axum application with all routes wired up
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!(
        "📁 Ensuring data directory exists: {}",
        config.storage.data_dir
    );
    std::fs::create_dir_all(&config.storage.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;

    tracing::info!("💾 Opening workflow database: {}", config.storage.database_path());
    let options = SqliteConnectOptions::new()
        .filename(config.storage.database_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;

    let storage = WorkflowStorage::new(pool);
    storage.init_schema().await?;

    tracing::info!("📋 Registering built-in capabilities");
    let registry = Arc::new(CapabilityRegistry::with_builtins(
        config.storage.workspace_dir(),
    ));

    let engine = Arc::new(WorkflowEngine::new(registry.clone()));

    let app_state = AppState {
        storage,
        engine,
        registry,
    };

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(create_workflow_routes().with_state(app_state.clone()))
        .merge(create_node_routes().with_state(app_state));

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting Swarmflow server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Liveness probe handler
async fn health_check() -> &'static str {
    "ok"
}
