/// HTTP API layer
///
/// REST endpoints for workflow management and execution plus the
/// capability metadata catalogue consumed by the editor.

pub mod nodes;
pub mod workflows;

pub use nodes::create_node_routes;
pub use workflows::{create_workflow_routes, AppState};
