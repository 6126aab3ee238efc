/// Swarmflow: graph-based workflow execution engine
///
/// Builds a petgraph DAG from a workflow definition, filters it to the
/// nodes reachable from its triggers, orders them deterministically and
/// dispatches built-in capabilities one node at a time, producing a
/// structured run report. An axum HTTP layer and SQLite persistence sit
/// on top of the engine.

// Core configuration and setup
pub mod config;

// Workflow definitions, persistence and validation
pub mod workflow;

// Graph construction, ordering and the execution run loop
pub mod engine;

// Capability trait, registry and the built-in node library
pub mod nodes;

// HTTP API layer
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use engine::context::{NodeStatus, RunReport, RunStatus};
pub use engine::WorkflowEngine;
pub use nodes::{Capability, CapabilityRegistry};
pub use server::start_server;
pub use workflow::{Edge, NodeSpec, WorkflowDefinition};
