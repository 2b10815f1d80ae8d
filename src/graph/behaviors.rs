// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pluggable behavior for widgets and frontend-only nodes.
//!
//! Behaviors are not part of the serialized graph. After loading a workflow
//! document, a [`BehaviorRegistry`] re-attaches them by node type and widget name.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::graph::types::{Node, NodeId};
use crate::graph::value_control::ValueControl;
use crate::graph::Graph;

/// Hooks a widget runs around job submission.
pub trait WidgetBehavior: Send + Sync + Debug {
    /// Runs once per compilation, before the graph is flattened.
    fn before_queued(&self, _value: &mut Value) {}

    /// Runs after the engine accepted a job built from this widget's node.
    fn after_queued(&self, _value: &mut Value) {}

    /// Replacement for the raw value in compiled jobs. `None` keeps the raw value.
    fn serialize_value(&self, _node: &Node, _value: &Value) -> Option<Value> {
        None
    }
}

/// Behavior of a node that exists only in the editor.
///
/// Virtual nodes are never emitted into a job. Links passing through them are
/// followed to whatever feeds the mapped input.
pub trait VirtualBehavior: Send + Sync + Debug {
    /// The input slot whose source feeds `output_slot`, or `None` when the
    /// output has no upstream source.
    fn input_for_output(&self, output_slot: usize) -> Option<usize> {
        Some(output_slot)
    }

    /// Push this node's effective values into the graph before compilation.
    fn apply_to_graph(&self, _node_id: &NodeId, _graph: &mut Graph) {}
}

/// Pass-through node: output `n` carries whatever arrives on input `n`.
#[derive(Debug, Default)]
pub struct Reroute;

impl VirtualBehavior for Reroute {}

/// Value source with no inputs. Before compilation it writes its `value`
/// widget into the same-named widget of every node its first output links to.
#[derive(Debug, Default)]
pub struct PrimitiveSource;

impl PrimitiveSource {
    pub const VALUE_WIDGET: &'static str = "value";
}

impl VirtualBehavior for PrimitiveSource {
    fn input_for_output(&self, _output_slot: usize) -> Option<usize> {
        None
    }

    fn apply_to_graph(&self, node_id: &NodeId, graph: &mut Graph) {
        let Some(node) = graph.find_node(node_id) else {
            return;
        };
        let Some(value) = node.widget(Self::VALUE_WIDGET).map(|w| w.value.clone()) else {
            return;
        };
        let targets: Vec<(NodeId, String)> = node
            .outputs
            .first()
            .map(|output| {
                output
                    .links
                    .iter()
                    .filter_map(|link_id| graph.link(*link_id))
                    .filter_map(|link| {
                        let target = graph.find_node(&link.target_id)?;
                        let input = target.inputs.get(link.target_slot)?;
                        Some((link.target_id.clone(), input.name.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        for (target_id, widget_name) in targets {
            if let Some(widget) = graph
                .find_node_mut(&target_id)
                .and_then(|target| target.widget_mut(&widget_name))
            {
                widget.value = value.clone();
            }
        }
    }
}

/// Re-attaches behaviors to a deserialized graph.
///
/// # Examples
///
/// ```
/// use dagwood_client::graph::{BehaviorRegistry, Graph, Node};
///
/// let mut graph = Graph::new();
/// graph.add_node(Node::new(1, "Reroute").with_input("", "*").with_output("", "*"));
///
/// BehaviorRegistry::with_builtins().attach(&mut graph);
/// assert!(graph.node(&1.into()).unwrap().is_virtual());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BehaviorRegistry {
    virtual_nodes: HashMap<String, Arc<dyn VirtualBehavior>>,
    widgets: HashMap<String, Arc<dyn WidgetBehavior>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Reroute` and `PrimitiveNode` virtual nodes, and a randomized
    /// `control_after_generate` for `seed` widgets.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_virtual("Reroute", Arc::new(Reroute));
        registry.register_virtual("PrimitiveNode", Arc::new(PrimitiveSource));
        registry.register_widget("seed", Arc::new(ValueControl::randomize()));
        registry
    }

    pub fn register_virtual(&mut self, type_name: impl Into<String>, behavior: Arc<dyn VirtualBehavior>) {
        self.virtual_nodes.insert(type_name.into(), behavior);
    }

    pub fn register_widget(&mut self, widget_name: impl Into<String>, behavior: Arc<dyn WidgetBehavior>) {
        self.widgets.insert(widget_name.into(), behavior);
    }

    /// Attach behaviors to every node, inner nodes included. Existing
    /// behaviors are left in place.
    pub fn attach(&self, graph: &mut Graph) {
        for node in graph.nodes_mut() {
            self.attach_node(node);
        }
    }

    fn attach_node(&self, node: &mut Node) {
        if node.virtual_behavior.is_none() {
            node.virtual_behavior = self.virtual_nodes.get(&node.type_name).cloned();
        }
        for widget in &mut node.widgets {
            if widget.behavior.is_none() {
                widget.behavior = self.widgets.get(&widget.name).cloned();
            }
        }
        for inner in &mut node.inner_nodes {
            self.attach_node(inner);
        }
    }
}
