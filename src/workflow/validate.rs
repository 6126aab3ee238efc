/// API-boundary validation for workflow definitions
///
/// Collects every violation into a list instead of failing on the first
/// one. The engine itself stays permissive; this runs before save and run
/// so obviously broken definitions are rejected with all their problems
/// reported at once. Shape errors (missing id/type fields, wrong JSON
/// types) are already covered by deserialization and never reach here.

use std::collections::{HashMap, HashSet};

use crate::workflow::types::WorkflowDefinition;

/// Node types that accept at most one input connection
const SINGLE_INPUT_NODE_TYPES: [&str; 7] = [
    "http_request",
    "write_file",
    "read_file",
    "email_send",
    "set_variable",
    "data_transform",
    "delay",
];

/// Validate a definition; an empty list means it passed
pub fn validate_definition(definition: &WorkflowDefinition) -> Vec<String> {
    let mut errors = Vec::new();

    if definition.nodes.is_empty() {
        errors.push("Workflow must contain at least one node".to_string());
        return errors;
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in &definition.nodes {
        if node.id.is_empty() {
            errors.push("Workflow contains a node with an empty id".to_string());
        } else if !seen_ids.insert(node.id.as_str()) {
            errors.push(format!("Duplicate node id '{}'", node.id));
        }
    }

    let declared: HashSet<&str> = definition.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut input_counts: HashMap<&str, usize> = HashMap::new();
    for conn in &definition.connections {
        if declared.contains(conn.target.as_str()) {
            *input_counts.entry(conn.target.as_str()).or_insert(0) += 1;
        }
    }

    for node in &definition.nodes {
        if SINGLE_INPUT_NODE_TYPES.contains(&node.node_type.as_str())
            && input_counts.get(node.id.as_str()).copied().unwrap_or(0) > 1
        {
            errors.push(format!(
                "Node '{}' ({}) can only have one input connection",
                node.id, node.node_type
            ));
        }
    }

    for node in &definition.nodes {
        let config = &node.config;
        match node.node_type.as_str() {
            "http_request" => {
                if absent(config.get("url")) {
                    errors.push(format!("Node '{}' (HTTP Request) requires a URL", node.id));
                }
            }
            "email_send" => {
                for field in ["to", "subject", "body"] {
                    if absent(config.get(field)) {
                        errors.push(format!(
                            "Node '{}' (Email Send) requires '{}'",
                            node.id, field
                        ));
                    }
                }
            }
            "write_file" | "read_file" => {
                if absent(config.get("path")) {
                    errors.push(format!(
                        "Node '{}' ({}) requires a file path",
                        node.id, node.node_type
                    ));
                } else if node.node_type == "write_file" && absent(config.get("content")) {
                    errors.push(format!("Node '{}' (Write File) requires content", node.id));
                }
            }
            _ => {}
        }
    }

    errors
}

/// Missing, null and empty-string values all count as absent
fn absent(value: Option<&serde_json::Value>) -> bool {
    match value {
        None => true,
        Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
