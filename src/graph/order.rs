// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Deterministic execution order over the top-level nodes of a [`Graph`].
//!
//! Kahn's algorithm with a min-heap keyed on insertion index: among all nodes
//! whose upstream nodes are already placed, the one added to the graph first
//! goes next. Links from or to inner nodes count against their composite.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::graph::types::{Node, NodeId};
use crate::graph::Graph;
use crate::observability::messages::compiler::CyclicExecutionOrder;
use crate::observability::messages::StructuredLog;

/// Top-level node ids, upstream before downstream.
///
/// Nodes caught on a cycle cannot be ordered topologically; they are appended
/// in insertion order after everything else so compilation still sees every node.
///
/// # Examples
///
/// ```
/// use dagwood_client::graph::{execution_order, Graph, Node, NodeId};
///
/// let mut graph = Graph::new();
/// graph.add_node(Node::new(2, "Decode").with_input("samples", "LATENT"));
/// graph.add_node(Node::new(1, "Sampler").with_output("LATENT", "LATENT"));
/// graph.connect(&1.into(), 0, &2.into(), 0).unwrap();
///
/// assert_eq!(execution_order(&graph), vec![NodeId::Int(1), NodeId::Int(2)]);
/// ```
pub fn execution_order(graph: &Graph) -> Vec<NodeId> {
    let nodes = graph.nodes();

    // Owning top-level index for every id, inner nodes included
    let mut owner: HashMap<&NodeId, usize> = HashMap::new();
    for (index, node) in nodes.iter().enumerate() {
        register_owner(node, index, &mut owner);
    }

    let mut in_degree = vec![0usize; nodes.len()];
    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for link in graph.links() {
        let (Some(&from), Some(&to)) = (owner.get(&link.origin_id), owner.get(&link.target_id)) else {
            continue;
        };
        if from == to {
            continue;
        }
        downstream[from].push(to);
        in_degree[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    let mut placed = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(index)) = ready.pop() {
        placed[index] = true;
        order.push(nodes[index].id.clone());
        for &next in &downstream[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() < nodes.len() {
        let stuck: Vec<NodeId> = nodes
            .iter()
            .zip(&placed)
            .filter(|(_, placed)| !**placed)
            .map(|(node, _)| node.id.clone())
            .collect();
        CyclicExecutionOrder { nodes_on_cycle: stuck.len() }.log();
        order.extend(stuck);
    }

    order
}

fn register_owner<'a>(node: &'a Node, index: usize, owner: &mut HashMap<&'a NodeId, usize>) {
    owner.insert(&node.id, index);
    for inner in &node.inner_nodes {
        register_owner(inner, index, owner);
    }
}
