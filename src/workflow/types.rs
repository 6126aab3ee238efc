/// Core workflow type definitions
///
/// Defines the structures for workflow definitions, nodes, and connections as
/// they travel over the wire and into SQLite. The engine consumes these types
/// read-only; nothing here is mutated once a run starts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Node types that act as workflow entry points
///
/// Reachability filtering walks the graph from every node whose type appears
/// here. Membership is a property of the type string alone, so an entry-point
/// type without a registered capability still anchors reachability (its
/// dispatch then fails as an ordinary node-level error).
pub const TRIGGER_NODE_TYPES: [&str; 5] = [
    "manual_trigger",
    "webhook_trigger",
    "schedule_trigger",
    "email_trigger",
    "file_trigger",
];

/// A complete workflow definition containing nodes and their connections
///
/// Definitions are stored as JSON in SQLite and compiled into a petgraph DAG
/// per run. A workflow may declare several entry points (trigger nodes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow identifier (e.g., "wf-enrichment")
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    /// List of nodes in this workflow
    pub nodes: Vec<NodeSpec>,
    /// List of edges connecting nodes
    #[serde(default)]
    pub connections: Vec<Edge>,
    /// Workflow-scoped variables seeded into the run context before the
    /// first node executes
    #[serde(default)]
    pub variables: HashMap<String, Value>,
}

/// A single node in the workflow graph
///
/// Nodes are opaque work units: the `node_type` string selects a capability
/// from the registry and `config` is that capability's input, resolved for
/// `{{context...}}` references just before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique node identifier within the workflow (e.g., "n1", "fetch-users")
    pub id: String,
    /// Capability key determining execution behavior (e.g., "http_request")
    #[serde(rename = "type")]
    pub node_type: String,
    /// Node-specific configuration, free-form JSON mapping
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Editor canvas position; the x coordinate doubles as the left-to-right
    /// tie-break for nodes at the same dependency level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Canvas coordinates of a node in the visual editor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Connection between two nodes in the workflow graph
///
/// An edge means "target depends on source's output being available first".
/// The execution engine uses these to build the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID
    pub source: String,
    /// Target node ID
    pub target: String,
}

impl WorkflowDefinition {
    /// True when any node carries editor position data, which switches the
    /// orderer into position-aware mode
    pub fn has_positions(&self) -> bool {
        self.nodes.iter().any(|n| n.position.is_some())
    }
}

impl NodeSpec {
    /// True when this node's type is a workflow entry point
    pub fn is_trigger(&self) -> bool {
        TRIGGER_NODE_TYPES.contains(&self.node_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_deserializes_wire_shape() {
        let def: WorkflowDefinition = serde_json::from_value(json!({
            "id": "wf-1",
            "name": "demo",
            "nodes": [
                {"id": "a", "type": "manual_trigger", "config": {}},
                {"id": "b", "type": "http_request",
                 "config": {"url": "http://example.test"},
                 "position": {"x": 120.0, "y": 40.0}}
            ],
            "connections": [{"source": "a", "target": "b"}]
        }))
        .unwrap();

        assert_eq!(def.nodes.len(), 2);
        assert_eq!(def.nodes[1].node_type, "http_request");
        assert_eq!(def.connections[0].target, "b");
        assert!(def.variables.is_empty());
        assert!(def.has_positions());
    }

    #[test]
    fn trigger_membership_follows_type_string() {
        let trigger: NodeSpec = serde_json::from_value(json!({
            "id": "t", "type": "webhook_trigger"
        }))
        .unwrap();
        let plain: NodeSpec = serde_json::from_value(json!({
            "id": "n", "type": "http_request"
        }))
        .unwrap();

        assert!(trigger.is_trigger());
        assert!(!plain.is_trigger());
    }
}
