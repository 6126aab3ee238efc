/// Workflow graph construction and trigger reachability
///
/// Turns the flat node and connection lists into a petgraph DiGraph with
/// bidirectional id/index maps, then restricts execution to nodes reachable
/// from trigger-type entry points. Input handling is deliberately
/// permissive: edges naming undeclared nodes are dropped with a log entry,
/// and disconnected non-trigger nodes are filtered out rather than
/// rejected. Strictness belongs to the API boundary, not here.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

use super::context::{ExecutionContext, LogLevel};
use crate::workflow::types::{Edge, NodeSpec};

/// A workflow compiled into a petgraph DAG for one run
#[derive(Debug)]
pub(crate) struct WorkflowGraph {
    /// The petgraph DiGraph structure
    pub graph: DiGraph<NodeSpec, ()>,
    /// Mapping from node ID to graph node index
    pub node_id_to_index: HashMap<String, NodeIndex>,
    /// Mapping from graph node index to node ID
    pub index_to_node_id: HashMap<NodeIndex, String>,
}

impl WorkflowGraph {
    /// Build the graph, keeping every declared node and every edge whose
    /// endpoints both resolve. Dangling edges are logged and dropped.
    pub(crate) fn build(
        nodes: &[NodeSpec],
        connections: &[Edge],
        ctx: &mut ExecutionContext,
    ) -> Self {
        let mut graph = DiGraph::new();
        let mut node_id_to_index = HashMap::new();
        let mut index_to_node_id = HashMap::new();

        for node in nodes {
            let node_index = graph.add_node(node.clone());
            node_id_to_index.insert(node.id.clone(), node_index);
            index_to_node_id.insert(node_index, node.id.clone());
        }

        for edge in connections {
            match (
                node_id_to_index.get(&edge.source),
                node_id_to_index.get(&edge.target),
            ) {
                (Some(&source), Some(&target)) => {
                    graph.add_edge(source, target, ());
                }
                _ => {
                    tracing::debug!(
                        "🔗 Dropping edge '{}' → '{}': endpoint not declared",
                        edge.source,
                        edge.target
                    );
                    ctx.log(
                        LogLevel::Warning,
                        None,
                        format!(
                            "Dropped connection {} -> {}: references an undeclared node",
                            edge.source, edge.target
                        ),
                    );
                }
            }
        }

        Self {
            graph,
            node_id_to_index,
            index_to_node_id,
        }
    }

    pub(crate) fn node_id(&self, index: NodeIndex) -> &str {
        self.index_to_node_id
            .get(&index)
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    /// Nodes eligible to execute: triggers plus everything reachable from
    /// them. Without any trigger node the whole graph stays eligible and a
    /// diagnostic lands in the debug log.
    pub(crate) fn reachable_from_triggers(
        &self,
        ctx: &mut ExecutionContext,
    ) -> HashSet<NodeIndex> {
        let triggers: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_trigger())
            .collect();

        if triggers.is_empty() {
            ctx.log(
                LogLevel::Warning,
                None,
                "Workflow declares no trigger nodes; executing all nodes",
            );
            return self.graph.node_indices().collect();
        }

        let mut reachable = HashSet::new();
        let mut queue = VecDeque::new();

        for trigger in triggers {
            if reachable.insert(trigger) {
                queue.push_back(trigger);
            }
        }

        while let Some(current) = queue.pop_front() {
            let mut neighbors = self.graph.neighbors(current).detach();
            while let Some(target) = neighbors.next_node(&self.graph) {
                if reachable.insert(target) {
                    queue.push_back(target);
                }
            }
        }

        for idx in self.graph.node_indices() {
            if !reachable.contains(&idx) {
                tracing::debug!("⏭️ Filtering unreachable node '{}'", self.node_id(idx));
                ctx.log(
                    LogLevel::Info,
                    Some(self.node_id(idx)),
                    format!(
                        "Node {} is not connected to any trigger; skipping",
                        self.node_id(idx)
                    ),
                );
            }
        }

        reachable
    }
}
