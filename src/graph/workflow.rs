// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::types::{Link, LinkId, Node, NodeId};

/// Editor graph: nodes in insertion order plus the links between their slots.
///
/// Every target slot holds at most one incoming link; connecting a slot that
/// already has one replaces it. Output slots fan out freely.
///
/// Serializes to the editor's workflow document
/// (`last_node_id`, `last_link_id`, `nodes`, `links`, `version`), which is
/// also the snapshot attached to every submitted job.
///
/// # Examples
///
/// ```
/// use dagwood_client::graph::{Graph, Node};
///
/// let mut graph = Graph::new();
/// graph.add_node(Node::new(1, "CheckpointLoader").with_output("MODEL", "MODEL"));
/// graph.add_node(Node::new(2, "KSampler").with_input("model", "MODEL"));
///
/// let link = graph.connect(&1.into(), 0, &2.into(), 0).unwrap();
/// assert_eq!(graph.node(&2.into()).unwrap().input_link(0), Some(link));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "WorkflowDocument", into = "WorkflowDocument")]
pub struct Graph {
    nodes: Vec<Node>,
    links: BTreeMap<LinkId, Link>,
    last_node_id: i64,
    last_link_id: LinkId,
}

const WORKFLOW_VERSION: f64 = 0.4;

#[derive(Serialize, Deserialize)]
struct WorkflowDocument {
    #[serde(default)]
    last_node_id: i64,
    #[serde(default)]
    last_link_id: LinkId,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    version: f64,
}

impl From<WorkflowDocument> for Graph {
    fn from(doc: WorkflowDocument) -> Self {
        let links: BTreeMap<LinkId, Link> = doc.links.into_iter().map(|l| (l.id, l)).collect();
        let max_link = links.keys().next_back().copied().unwrap_or(0);
        let max_node = doc
            .nodes
            .iter()
            .filter_map(|n| match n.id {
                NodeId::Int(id) => Some(id),
                NodeId::Str(_) => None,
            })
            .max()
            .unwrap_or(0);
        Self {
            nodes: doc.nodes,
            links,
            last_node_id: doc.last_node_id.max(max_node),
            last_link_id: doc.last_link_id.max(max_link),
        }
    }
}

impl From<Graph> for WorkflowDocument {
    fn from(graph: Graph) -> Self {
        Self {
            last_node_id: graph.last_node_id,
            last_link_id: graph.last_link_id,
            nodes: graph.nodes,
            links: graph.links.into_values().collect(),
            version: WORKFLOW_VERSION,
        }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a workflow document.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Append a node, replacing any top-level node with the same id.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        if let NodeId::Int(id) = node.id {
            self.last_node_id = self.last_node_id.max(id);
        }
        let id = node.id.clone();
        self.remove_node(&id);
        self.nodes.push(node);
        id
    }

    /// Next free integer id.
    pub fn next_node_id(&self) -> NodeId {
        NodeId::Int(self.last_node_id + 1)
    }

    /// Remove a top-level node together with every link touching it.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let position = self.nodes.iter().position(|n| &n.id == id)?;
        let touching: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| &l.origin_id == id || &l.target_id == id)
            .map(|l| l.id)
            .collect();
        for link_id in touching {
            self.remove_link(link_id);
        }
        Some(self.nodes.remove(position))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    /// Node by id, searching inside composite nodes as well.
    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        fn search<'a>(nodes: &'a [Node], id: &NodeId) -> Option<&'a Node> {
            nodes.iter().find_map(|n| {
                if &n.id == id {
                    Some(n)
                } else {
                    search(&n.inner_nodes, id)
                }
            })
        }
        search(&self.nodes, id)
    }

    pub fn find_node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        fn search<'a>(nodes: &'a mut [Node], id: &NodeId) -> Option<&'a mut Node> {
            for node in nodes.iter_mut() {
                if &node.id == id {
                    return Some(node);
                }
                if let Some(found) = search(&mut node.inner_nodes, id) {
                    return Some(found);
                }
            }
            None
        }
        search(&mut self.nodes, id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Link `origin`'s output slot to `target`'s input slot.
    ///
    /// Returns `None` when either endpoint or slot does not exist. Works for
    /// inner nodes of composites as well as top-level nodes.
    pub fn connect(
        &mut self,
        origin: &NodeId,
        origin_slot: usize,
        target: &NodeId,
        target_slot: usize,
    ) -> Option<LinkId> {
        let link_type = self.find_node(origin)?.outputs.get(origin_slot)?.slot_type.clone();
        let previous = self.find_node(target)?.inputs.get(target_slot)?.link;
        if let Some(previous) = previous {
            self.remove_link(previous);
        }

        self.last_link_id += 1;
        let id = self.last_link_id;
        self.links.insert(
            id,
            Link {
                id,
                origin_id: origin.clone(),
                origin_slot,
                target_id: target.clone(),
                target_slot,
                link_type,
            },
        );
        if let Some(output) = self
            .find_node_mut(origin)
            .and_then(|n| n.outputs.get_mut(origin_slot))
        {
            output.links.push(id);
        }
        if let Some(input) = self
            .find_node_mut(target)
            .and_then(|n| n.inputs.get_mut(target_slot))
        {
            input.link = Some(id);
        }
        Some(id)
    }

    /// Run the `after_queued` widget hooks of the given nodes and their inner nodes.
    pub fn run_after_queued(&mut self, ids: &[NodeId]) {
        fn run(node: &mut Node) {
            for widget in &mut node.widgets {
                if let Some(behavior) = &widget.behavior {
                    behavior.after_queued(&mut widget.value);
                }
            }
            for inner in &mut node.inner_nodes {
                run(inner);
            }
        }
        for id in ids {
            if let Some(node) = self.find_node_mut(id) {
                run(node);
            }
        }
    }

    /// Remove a link and clear both of its endpoints.
    pub fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.remove(&id)?;
        if let Some(output) = self
            .find_node_mut(&link.origin_id)
            .and_then(|n| n.outputs.get_mut(link.origin_slot))
        {
            output.links.retain(|l| *l != id);
        }
        if let Some(input) = self
            .find_node_mut(&link.target_id)
            .and_then(|n| n.inputs.get_mut(link.target_slot))
        {
            if input.link == Some(id) {
                input.link = None;
            }
        }
        Some(link)
    }
}
