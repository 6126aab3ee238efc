/// Run-scoped execution state and the final report types
///
/// A single `ExecutionContext` is created per run, mutated only between node
/// dispatches, and folded into the `RunReport` handed back to the caller.
/// Capabilities see it through a narrow append/read surface (`get_result`,
/// `get_variable`, `set_variable`) so one node cannot rewrite another
/// node's recorded output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Lifecycle state of a single node within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Success,
    Error,
}

/// Severity of a debug-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One line of the append-only run debug log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(rename = "nodeId")]
    pub node_id: Option<String>,
    pub message: String,
}

/// One entry of the run-level error list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    #[serde(rename = "nodeId")]
    pub node_id: Option<String>,
    pub message: String,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Per-node entry of the final report, in execution order
///
/// Success carries `result`, failure carries `error`; a node never has both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRunRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// Final execution report returned by `execute_workflow`
///
/// Always returned as a plain value: structural aborts and node failures
/// both land here as `status == Error` plus entries in `errors`, so callers
/// never need a separate error path for a failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub progress: u8,
    /// Node ids in the order the orderer scheduled them
    pub execution_order: Vec<String>,
    /// Per-node outcomes in the order nodes actually ran
    pub nodes: Vec<NodeRunRecord>,
    pub statuses: HashMap<String, NodeStatus>,
    pub errors: Vec<RunError>,
    pub debug_log: Vec<DebugLogEntry>,
}

impl RunReport {
    /// True when the run completed without structural or node-level errors
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Mutable state threaded through a single run
#[derive(Debug, Default)]
pub struct ExecutionContext {
    results: HashMap<String, Value>,
    result_order: Vec<String>,
    variables: HashMap<String, Value>,
    statuses: HashMap<String, NodeStatus>,
    debug_log: Vec<DebugLogEntry>,
    errors: Vec<RunError>,
    progress: u8,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context pre-seeded with workflow-scoped variables
    pub fn with_variables(variables: HashMap<String, Value>) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }

    /// Recorded output of an earlier node, if it succeeded
    pub fn get_result(&self, node_id: &str) -> Option<&Value> {
        self.results.get(node_id)
    }

    /// Record a node's output. First write wins; results are append-only.
    pub(crate) fn set_result(&mut self, node_id: &str, value: Value) {
        if !self.results.contains_key(node_id) {
            self.result_order.push(node_id.to_string());
            self.results.insert(node_id.to_string(), value);
        }
    }

    /// Node ids with recorded results, in completion order
    pub fn result_ids(&self) -> &[String] {
        &self.result_order
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Write a workflow-scoped variable, visible to all later nodes
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    pub fn status(&self, node_id: &str) -> Option<NodeStatus> {
        self.statuses.get(node_id).copied()
    }

    pub(crate) fn set_status(&mut self, node_id: &str, status: NodeStatus) {
        self.statuses.insert(node_id.to_string(), status);
    }

    /// Append a debug-log line. The log only ever grows.
    pub(crate) fn log(&mut self, level: LogLevel, node_id: Option<&str>, message: impl Into<String>) {
        self.debug_log.push(DebugLogEntry {
            timestamp: Utc::now(),
            level,
            node_id: node_id.map(str::to_string),
            message: message.into(),
        });
    }

    pub(crate) fn record_error(
        &mut self,
        node_id: Option<&str>,
        message: impl Into<String>,
        detail: Option<String>,
    ) {
        self.errors.push(RunError {
            node_id: node_id.map(str::to_string),
            message: message.into(),
            detail,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn errors(&self) -> &[RunError] {
        &self.errors
    }

    /// Progress may only move forward within a run
    pub(crate) fn set_progress(&mut self, progress: u8) {
        if progress > self.progress {
            self.progress = progress.min(100);
        }
    }

    /// Consume the context into its report components
    pub(crate) fn into_parts(
        self,
    ) -> (
        HashMap<String, NodeStatus>,
        Vec<RunError>,
        Vec<DebugLogEntry>,
        u8,
    ) {
        (self.statuses, self.errors, self.debug_log, self.progress)
    }
}
