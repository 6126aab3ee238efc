/// Petgraph-based workflow execution engine
///
/// Builds a directed graph from a workflow definition, filters it to the
/// nodes reachable from trigger nodes, orders them deterministically and
/// dispatches each node's capability strictly one at a time. A node failure
/// is recorded and execution moves on; only structural problems (an empty
/// workflow, a cycle) abort the run before any node executes. Either way
/// the caller gets a full run report, never an Err.

pub mod context;
pub mod error;
pub mod mask;
pub mod template;

mod graph;
mod order;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::nodes::CapabilityRegistry;
use crate::workflow::types::WorkflowDefinition;
use context::{ExecutionContext, LogLevel, NodeRunRecord, NodeStatus, RunReport, RunStatus};
use error::EngineError;
use graph::WorkflowGraph;

pub use context::{DebugLogEntry, RunError};

/// Workflow execution engine
///
/// Holds the capability registry and runs one workflow definition at a
/// time. Stateless between runs; every run gets a fresh context.
#[derive(Debug)]
pub struct WorkflowEngine {
    /// Capability lookup for node dispatch
    registry: Arc<CapabilityRegistry>,
}

impl WorkflowEngine {
    /// Create a new engine over a capability registry
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// Execute a workflow definition and return its run report
    ///
    /// Never returns an error: structural failures and node failures both
    /// land in the report with status `error`.
    pub async fn execute_workflow(&self, definition: &WorkflowDefinition) -> RunReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut ctx = ExecutionContext::with_variables(definition.variables.clone());

        tracing::info!(
            "🚀 Starting workflow run {}: '{}' ({})",
            run_id,
            definition.name,
            definition.id
        );

        if definition.nodes.is_empty() {
            let message = EngineError::EmptyWorkflow.to_string();
            tracing::warn!("❌ Run {} aborted: {}", run_id, message);
            ctx.log(LogLevel::Error, None, message.clone());
            ctx.record_error(None, message, None);
            return finish(definition, run_id, started_at, clock, Vec::new(), Vec::new(), ctx);
        }

        tracing::debug!(
            "📊 Building workflow graph with {} nodes and {} connections",
            definition.nodes.len(),
            definition.connections.len()
        );
        let wg = WorkflowGraph::build(&definition.nodes, &definition.connections, &mut ctx);
        let eligible = wg.reachable_from_triggers(&mut ctx);

        let ordered = match order::execution_order(&wg, &eligible, definition.has_positions()) {
            Ok(ordered) => ordered,
            Err(err) => {
                let message = err.to_string();
                tracing::warn!("❌ Run {} aborted: {}", run_id, message);
                let node_id = match &err {
                    EngineError::CycleDetected { node_id } => Some(node_id.clone()),
                    _ => None,
                };
                ctx.log(LogLevel::Error, node_id.as_deref(), message.clone());
                ctx.record_error(node_id.as_deref(), message, None);
                return finish(
                    definition,
                    run_id,
                    started_at,
                    clock,
                    Vec::new(),
                    Vec::new(),
                    ctx,
                );
            }
        };

        let order_ids: Vec<String> = ordered
            .iter()
            .map(|&idx| wg.node_id(idx).to_string())
            .collect();
        tracing::info!("📋 Execution order: {:?}", order_ids);
        ctx.log(
            LogLevel::Info,
            None,
            format!("Execution order: {:?}", order_ids),
        );

        for id in &order_ids {
            ctx.set_status(id, NodeStatus::Pending);
        }

        let total = ordered.len();
        let mut completed = 0usize;
        let mut records: Vec<NodeRunRecord> = Vec::with_capacity(total);

        for (step, &node_index) in ordered.iter().enumerate() {
            let node = wg.graph[node_index].clone();
            let node_id = node.id.as_str();

            ctx.set_status(node_id, NodeStatus::Running);
            tracing::info!(
                "📍 Step {}/{}: executing node '{}' (type: {})",
                step + 1,
                total,
                node_id,
                node.node_type
            );
            ctx.log(
                LogLevel::Info,
                Some(node_id),
                format!("Executing node {} of type {}", node_id, node.node_type),
            );

            let resolved = template::resolve_config(&node.config, &ctx);
            let masked_config = mask::masked(&Value::Object(resolved.clone()));
            ctx.log(
                LogLevel::Info,
                Some(node_id),
                format!("Node config: {}", masked_config),
            );

            let node_clock = Instant::now();
            let record = match self.registry.get(&node.node_type) {
                None => {
                    let message = format!("Node type '{}' not found", node.node_type);
                    tracing::warn!("❌ Node '{}' failed: {}", node_id, message);
                    ctx.log(LogLevel::Error, Some(node_id), message.clone());
                    ctx.record_error(Some(node_id), message.clone(), None);
                    ctx.set_status(node_id, NodeStatus::Error);
                    NodeRunRecord {
                        id: node.id.clone(),
                        node_type: node.node_type.clone(),
                        status: NodeStatus::Error,
                        result: None,
                        error: Some(message),
                        duration_ms: node_clock.elapsed().as_millis() as u64,
                    }
                }
                Some(capability) => match capability.run(resolved, &mut ctx).await {
                    Ok(result) => {
                        let duration_ms = node_clock.elapsed().as_millis() as u64;
                        tracing::info!(
                            "✅ Node '{}' completed in {}ms",
                            node_id,
                            duration_ms
                        );
                        ctx.log(
                            LogLevel::Info,
                            Some(node_id),
                            format!("Node {} completed in {}ms", node_id, duration_ms),
                        );
                        ctx.set_result(node_id, result.clone());
                        ctx.set_status(node_id, NodeStatus::Success);
                        NodeRunRecord {
                            id: node.id.clone(),
                            node_type: node.node_type.clone(),
                            status: NodeStatus::Success,
                            result: Some(result),
                            error: None,
                            duration_ms,
                        }
                    }
                    Err(err) => {
                        let message = format!("Error executing node {}: {}", node_id, err);
                        let detail: Vec<String> =
                            err.chain().skip(1).map(ToString::to_string).collect();
                        let detail = if detail.is_empty() {
                            None
                        } else {
                            Some(detail.join(": "))
                        };
                        tracing::warn!("❌ Node '{}' failed: {}", node_id, message);
                        ctx.log(LogLevel::Error, Some(node_id), message.clone());
                        ctx.record_error(Some(node_id), message.clone(), detail);
                        ctx.set_status(node_id, NodeStatus::Error);
                        NodeRunRecord {
                            id: node.id.clone(),
                            node_type: node.node_type.clone(),
                            status: NodeStatus::Error,
                            result: None,
                            error: Some(message),
                            duration_ms: node_clock.elapsed().as_millis() as u64,
                        }
                    }
                },
            };

            records.push(record);
            completed += 1;
            ctx.set_progress(((completed * 100) / total) as u8);
        }

        finish(definition, run_id, started_at, clock, order_ids, records, ctx)
    }
}

/// Assemble the run report from the consumed context
fn finish(
    definition: &WorkflowDefinition,
    run_id: String,
    started_at: DateTime<Utc>,
    clock: Instant,
    execution_order: Vec<String>,
    nodes: Vec<NodeRunRecord>,
    ctx: ExecutionContext,
) -> RunReport {
    let status = if ctx.errors().is_empty() {
        RunStatus::Success
    } else {
        RunStatus::Error
    };
    let (statuses, errors, debug_log, progress) = ctx.into_parts();
    let finished_at = Utc::now();
    let duration_ms = clock.elapsed().as_millis() as u64;

    tracing::info!(
        "🎉 Workflow run {} finished with status {:?} in {}ms",
        run_id,
        status,
        duration_ms
    );

    RunReport {
        run_id,
        workflow_id: definition.id.clone(),
        workflow_name: definition.name.clone(),
        status,
        started_at,
        finished_at,
        duration_ms,
        progress,
        execution_order,
        nodes,
        statuses,
        errors,
        debug_log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Capability;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use serde_json::{json, Map};

    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        fn node_type(&self) -> &'static str {
            "echo"
        }
        fn name(&self) -> &'static str {
            "Echo"
        }
        fn description(&self) -> &'static str {
            "Returns its resolved config"
        }
        async fn run(
            &self,
            config: Map<String, Value>,
            _ctx: &mut ExecutionContext,
        ) -> Result<Value> {
            Ok(Value::Object(config))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Capability for AlwaysFails {
        fn node_type(&self) -> &'static str {
            "always_fails"
        }
        fn name(&self) -> &'static str {
            "Always Fails"
        }
        fn description(&self) -> &'static str {
            "Fails on every run"
        }
        async fn run(
            &self,
            _config: Map<String, Value>,
            _ctx: &mut ExecutionContext,
        ) -> Result<Value> {
            bail!("boom")
        }
    }

    fn engine() -> WorkflowEngine {
        let registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(AlwaysFails));
        WorkflowEngine::new(Arc::new(registry))
    }

    fn definition(value: Value) -> WorkflowDefinition {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn empty_workflow_reports_error_without_executing() {
        let def = definition(json!({
            "id": "wf-empty",
            "name": "empty",
            "nodes": [],
            "connections": []
        }));
        let report = engine().execute_workflow(&def).await;

        assert_eq!(report.status, RunStatus::Error);
        assert!(report.nodes.is_empty());
        assert!(report.execution_order.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].message, "workflow has no nodes to execute");
    }

    #[tokio::test]
    async fn cycle_aborts_before_any_node_runs() {
        let def = definition(json!({
            "id": "wf-cycle",
            "name": "cycle",
            "nodes": [
                {"id": "a", "type": "echo"},
                {"id": "b", "type": "echo"}
            ],
            "connections": [
                {"source": "a", "target": "b"},
                {"source": "b", "target": "a"}
            ]
        }));
        let report = engine().execute_workflow(&def).await;

        assert_eq!(report.status, RunStatus::Error);
        assert!(report.nodes.is_empty());
        assert!(report.errors[0].message.contains("contains a cycle"));
    }

    #[tokio::test]
    async fn unknown_node_type_fails_that_node_only() {
        let def = definition(json!({
            "id": "wf-unknown",
            "name": "unknown",
            "nodes": [
                {"id": "a", "type": "no_such_type"},
                {"id": "b", "type": "echo", "config": {"tag": "still runs"}}
            ],
            "connections": [{"source": "a", "target": "b"}]
        }));
        let report = engine().execute_workflow(&def).await;

        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.nodes.len(), 2);
        assert_eq!(
            report.nodes[0].error.as_deref(),
            Some("Node type 'no_such_type' not found")
        );
        assert_eq!(report.nodes[1].status, NodeStatus::Success);
        assert_eq!(report.progress, 100);
    }

    #[tokio::test]
    async fn failed_node_is_isolated_and_run_continues() {
        let def = definition(json!({
            "id": "wf-isolate",
            "name": "isolate",
            "nodes": [
                {"id": "n1", "type": "echo"},
                {"id": "n2", "type": "always_fails"},
                {"id": "n3", "type": "echo"}
            ],
            "connections": [
                {"source": "n1", "target": "n2"},
                {"source": "n2", "target": "n3"}
            ]
        }));
        let report = engine().execute_workflow(&def).await;

        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.statuses["n1"], NodeStatus::Success);
        assert_eq!(report.statuses["n2"], NodeStatus::Error);
        assert_eq!(report.statuses["n3"], NodeStatus::Success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].message, "Error executing node n2: boom");
        assert_eq!(report.progress, 100);
    }

    #[tokio::test]
    async fn successful_run_reports_results_in_order() {
        let def = definition(json!({
            "id": "wf-ok",
            "name": "ok",
            "nodes": [
                {"id": "first", "type": "echo", "config": {"v": 1}},
                {"id": "second", "type": "echo", "config": {"from": "{{context.first.v}}"}}
            ],
            "connections": [{"source": "first", "target": "second"}]
        }));
        let report = engine().execute_workflow(&def).await;

        assert_eq!(report.status, RunStatus::Success);
        assert!(report.is_success());
        assert_eq!(report.execution_order, vec!["first", "second"]);
        assert_eq!(report.nodes[1].result, Some(json!({"from": "1"})));
        assert_eq!(report.progress, 100);
        assert!(report.errors.is_empty());
    }
}
