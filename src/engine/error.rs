/// Structural faults detected before any node executes
///
/// These are the only conditions that abort a whole run. Node-level failures
/// never surface here; they are captured into the run report and execution
/// continues.

/// Errors in the workflow graph itself
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The definition declares no nodes at all
    #[error("workflow has no nodes to execute")]
    EmptyWorkflow,

    /// The dependency graph contains a cycle; `node_id` is a node on it
    #[error("workflow contains a cycle that includes node '{node_id}'")]
    CycleDetected { node_id: String },
}
