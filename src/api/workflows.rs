/// Workflow REST endpoints
///
/// Save/list/get/delete over SQLite storage, plus run-workflow which
/// validates the posted definition, executes it and returns the full run
/// report. Validation failures come back as 400 with the collected error
/// list; a run that completed with node errors comes back as 422 so
/// callers can distinguish "ran but failed" from "would not run".

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    engine::WorkflowEngine,
    nodes::CapabilityRegistry,
    workflow::{storage::WorkflowStorage, types::WorkflowDefinition, validate_definition},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Workflow persistence
    pub storage: WorkflowStorage,
    /// Execution engine
    pub engine: Arc<WorkflowEngine>,
    /// Capability metadata for the node-types endpoint
    pub registry: Arc<CapabilityRegistry>,
}

/// Request body for save-workflow
#[derive(Debug, Deserialize)]
pub struct SaveWorkflowRequest {
    pub workflow: WorkflowDefinition,
}

/// Workflow management and execution routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/run-workflow", post(run_workflow))
        .route("/api/save-workflow", post(save_workflow))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{id}", get(get_workflow))
        .route("/api/workflows/{id}", delete(delete_workflow))
}

/// Execute a workflow definition posted in the request body
///
/// POST /api/run-workflow
/// 400 with the validation error list when the definition is invalid,
/// 200 with the report on success, 422 with the report when any node failed.
async fn run_workflow(
    State(state): State<AppState>,
    Json(definition): Json<WorkflowDefinition>,
) -> (StatusCode, Json<Value>) {
    let errors = validate_definition(&definition);
    if !errors.is_empty() {
        tracing::warn!(
            "🚫 Rejected workflow '{}': {} validation error(s)",
            definition.id,
            errors.len()
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "errors": errors })),
        );
    }

    let report = state.engine.execute_workflow(&definition).await;
    if report.is_success() {
        (
            StatusCode::OK,
            Json(json!({ "success": true, "report": report })),
        )
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "success": false, "report": report })),
        )
    }
}

/// Insert or update a workflow definition
///
/// POST /api/save-workflow
/// Body: { "workflow": { "id": "...", "name": "...", "nodes": [...], "connections": [...] } }
async fn save_workflow(
    State(state): State<AppState>,
    Json(payload): Json<SaveWorkflowRequest>,
) -> (StatusCode, Json<Value>) {
    let definition = payload.workflow;

    if definition.id.is_empty() || definition.name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "errors": ["Workflow id and name are required"]
            })),
        );
    }

    let errors = validate_definition(&definition);
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "errors": errors })),
        );
    }

    match state.storage.save_workflow(&definition).await {
        Ok(()) => {
            tracing::info!("💾 Saved workflow: {} ({})", definition.id, definition.name);
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "id": definition.id,
                    "message": format!("Workflow '{}' saved successfully", definition.name)
                })),
            )
        }
        Err(e) => {
            tracing::error!("Failed to save workflow {}: {}", definition.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "errors": ["Failed to save workflow"] })),
            )
        }
    }
}

/// List stored workflows as metadata
///
/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match state.storage.list_workflows().await {
        Ok(workflows) => Ok(Json(json!({ "success": true, "workflows": workflows }))),
        Err(e) => {
            tracing::error!("Failed to list workflows: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Fetch one stored workflow definition
///
/// GET /api/workflows/{id}
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    match state.storage.get_workflow(&id).await {
        Ok(Some(definition)) => Ok(Json(json!({ "success": true, "workflow": definition }))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get workflow {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Delete a stored workflow
///
/// DELETE /api/workflows/{id}
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    match state.storage.delete_workflow(&id).await {
        Ok(true) => {
            tracing::info!("🗑️ Deleted workflow: {}", id);
            Ok(Json(
                json!({ "success": true, "message": "Workflow deleted successfully" }),
            ))
        }
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to delete workflow {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
