/// Capability metadata endpoint
///
/// Serves the node-type catalogue the editor uses to draw its palette.

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

use super::workflows::AppState;

/// Node metadata routes
pub fn create_node_routes() -> Router<AppState> {
    Router::new().route("/api/node-types", get(node_types))
}

/// List every registered capability with its editor metadata
///
/// GET /api/node-types
async fn node_types(State(state): State<AppState>) -> Json<Value> {
    let node_types = state.registry.node_types();
    Json(json!({ "success": true, "node_types": node_types }))
}
