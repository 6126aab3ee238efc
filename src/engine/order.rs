/// Execution ordering over the workflow graph
///
/// Two strategies share a cycle check. The pure topological order is a
/// depth-first post-order (reversed) with three-color marking; hitting an
/// in-progress node mid-walk is a cycle and aborts the run before anything
/// executes. When any node in the definition carries canvas position data,
/// a second pass groups nodes into dependency levels and sorts each level
/// by ascending x, so independent nodes run in the order they appear
/// left-to-right in the editor. Levels concatenate into the final order;
/// anything the leveling never placed falls back to the topological order.

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

use super::error::EngineError;
use super::graph::WorkflowGraph;
use crate::workflow::types::NodeSpec;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Total execution order for the eligible node set
pub(crate) fn execution_order(
    wg: &WorkflowGraph,
    eligible: &HashSet<NodeIndex>,
    position_aware: bool,
) -> Result<Vec<NodeIndex>, EngineError> {
    // The topological pass always runs: it is the cycle gate for both
    // strategies and the fallback order for the position-aware one.
    let topo = pure_topological(wg, eligible)?;
    if position_aware {
        Ok(position_levels(wg, eligible, &topo))
    } else {
        Ok(topo)
    }
}

/// Reversed DFS post-order over the eligible subgraph
///
/// Roots are edge sources in first-appearance order; eligible nodes the
/// walk never touched (no edges at all) are appended in declaration order.
fn pure_topological(
    wg: &WorkflowGraph,
    eligible: &HashSet<NodeIndex>,
) -> Result<Vec<NodeIndex>, EngineError> {
    let mut marks = vec![Mark::Unvisited; wg.graph.node_count()];
    let mut postorder = Vec::with_capacity(eligible.len());

    let mut roots = Vec::new();
    let mut seen_roots = HashSet::new();
    for edge in wg.graph.edge_references() {
        let source = edge.source();
        if eligible.contains(&source)
            && eligible.contains(&edge.target())
            && seen_roots.insert(source)
        {
            roots.push(source);
        }
    }

    for root in roots {
        visit(wg, eligible, root, &mut marks, &mut postorder)?;
    }

    let mut order: Vec<NodeIndex> = postorder.into_iter().rev().collect();

    for idx in wg.graph.node_indices() {
        if eligible.contains(&idx) && marks[idx.index()] == Mark::Unvisited {
            order.push(idx);
        }
    }

    Ok(order)
}

fn visit(
    wg: &WorkflowGraph,
    eligible: &HashSet<NodeIndex>,
    idx: NodeIndex,
    marks: &mut Vec<Mark>,
    postorder: &mut Vec<NodeIndex>,
) -> Result<(), EngineError> {
    match marks[idx.index()] {
        Mark::InProgress => {
            return Err(EngineError::CycleDetected {
                node_id: wg.node_id(idx).to_string(),
            })
        }
        Mark::Done => return Ok(()),
        Mark::Unvisited => {}
    }

    marks[idx.index()] = Mark::InProgress;

    // petgraph iterates neighbors most-recent-first; reverse to follow
    // edge declaration order like the adjacency list it stands in for
    let mut targets: Vec<NodeIndex> = wg.graph.neighbors(idx).collect();
    targets.reverse();
    for target in targets {
        if eligible.contains(&target) {
            visit(wg, eligible, target, marks, postorder)?;
        }
    }

    marks[idx.index()] = Mark::Done;
    postorder.push(idx);
    Ok(())
}

/// Dependency levels with left-to-right ordering inside each level
///
/// A node is placed once every eligible predecessor sits in an earlier
/// level. Nodes without a position sort after positioned ones.
fn position_levels(
    wg: &WorkflowGraph,
    eligible: &HashSet<NodeIndex>,
    fallback: &[NodeIndex],
) -> Vec<NodeIndex> {
    let mut indegree: HashMap<NodeIndex, usize> =
        eligible.iter().map(|&idx| (idx, 0)).collect();
    for edge in wg.graph.edge_references() {
        if eligible.contains(&edge.source()) && eligible.contains(&edge.target()) {
            if let Some(count) = indegree.get_mut(&edge.target()) {
                *count += 1;
            }
        }
    }

    let mut order = Vec::with_capacity(eligible.len());
    let mut placed: HashSet<NodeIndex> = HashSet::new();

    loop {
        // Level candidates in declaration order keeps equal-x ties stable
        let mut level: Vec<NodeIndex> = wg
            .graph
            .node_indices()
            .filter(|idx| {
                eligible.contains(idx)
                    && !placed.contains(idx)
                    && indegree.get(idx).copied() == Some(0)
            })
            .collect();
        if level.is_empty() {
            break;
        }

        level.sort_by(|&a, &b| x_of(&wg.graph[a]).total_cmp(&x_of(&wg.graph[b])));

        for &idx in &level {
            placed.insert(idx);
            order.push(idx);
            let mut targets: Vec<NodeIndex> = wg.graph.neighbors(idx).collect();
            targets.reverse();
            for target in targets {
                if let Some(count) = indegree.get_mut(&target) {
                    *count = count.saturating_sub(1);
                }
            }
        }
    }

    // Anything the leveling could not place keeps its topological slot
    for &idx in fallback {
        if !placed.contains(&idx) {
            order.push(idx);
        }
    }

    order
}

fn x_of(spec: &NodeSpec) -> f64 {
    spec.position.map(|p| p.x).unwrap_or(f64::INFINITY)
}
