// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Graph flattening: editor [`Graph`] in, engine [`JobDescription`] out.
//!
//! Compilation runs in two phases:
//!
//! 1. **Prepare** mutates the graph. In execution order, every node (or, for a
//!    composite, each of its inner nodes) runs its widgets' `before_queued`
//!    hooks, and virtual nodes push their values into the graph.
//! 2. **Flatten** reads the prepared graph. Muted, bypassed and virtual nodes
//!    are skipped; every other node contributes its serializable widget values
//!    and its resolved links. Link references to nodes absent from the job are
//!    pruned at the end.
//!
//! Flattening never fails on graph shape. An input whose source cannot be
//! found is simply left out.
//!
//! # Examples
//!
//! ```
//! use dagwood_client::compiler::GraphCompiler;
//! use dagwood_client::graph::{Graph, Node, NodeMode};
//!
//! let mut graph = Graph::new();
//! graph.add_node(Node::new(1, "Loader").with_output("MODEL", "MODEL"));
//! graph.add_node(
//!     Node::new(2, "Lora")
//!         .with_mode(NodeMode::Bypass)
//!         .with_input("model", "MODEL")
//!         .with_output("MODEL", "MODEL"),
//! );
//! graph.add_node(Node::new(3, "Sampler").with_input("model", "MODEL"));
//! graph.connect(&1.into(), 0, &2.into(), 0).unwrap();
//! graph.connect(&2.into(), 0, &3.into(), 0).unwrap();
//!
//! let job = GraphCompiler::new().compile(&mut graph).unwrap();
//! let sampler = serde_json::to_value(job.output.get("3").unwrap()).unwrap();
//! assert_eq!(sampler["inputs"]["model"], serde_json::json!(["1", 0]));
//! assert!(job.output.get("2").is_none());
//! ```

mod job;
mod resolver;

use std::collections::BTreeMap;

pub use job::{CompiledJob, InputValue, JobDescription, JobNode, JobNodeMeta, LinkRef};

use crate::errors::CompileError;
use crate::graph::{execution_order, Graph, Node, NodeId};
use crate::observability::messages::compiler::{CompilationCompleted, InputUnresolved};
use crate::observability::messages::StructuredLog;

/// Turns a [`Graph`] into a [`CompiledJob`].
#[derive(Debug, Clone, Copy)]
pub struct GraphCompiler {
    dev_mode: bool,
    clean: bool,
}

impl Default for GraphCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphCompiler {
    pub fn new() -> Self {
        Self {
            dev_mode: false,
            clean: true,
        }
    }

    /// Attach `_meta.title` to every emitted node.
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Keep dangling link references instead of pruning them.
    pub fn without_cleanup(mut self) -> Self {
        self.clean = false;
        self
    }

    /// Run both phases.
    pub fn compile(&self, graph: &mut Graph) -> Result<CompiledJob, CompileError> {
        self.prepare(graph);
        self.flatten(graph)
    }

    /// Run pre-submission hooks in execution order.
    pub fn prepare(&self, graph: &mut Graph) {
        for outer in execution_order(graph) {
            for id in expanded_ids(graph, &outer) {
                if let Some(node) = graph.find_node_mut(&id) {
                    for widget in &mut node.widgets {
                        if let Some(behavior) = &widget.behavior {
                            behavior.before_queued(&mut widget.value);
                        }
                    }
                }
                let behavior = graph.find_node(&id).and_then(|n| n.virtual_behavior.clone());
                if let Some(behavior) = behavior {
                    behavior.apply_to_graph(&id, graph);
                }
            }
        }
    }

    /// Build the job description from an already prepared graph.
    pub fn flatten(&self, graph: &Graph) -> Result<CompiledJob, CompileError> {
        let workflow = serde_json::to_value(graph)?;
        let mut output = JobDescription::new();

        for outer_id in execution_order(graph) {
            let Some(outer) = graph.node(&outer_id) else {
                continue;
            };
            if outer.mode.is_skipped() {
                continue;
            }
            let members: Vec<&Node> = if outer.is_composite() {
                outer.inner_nodes.iter().collect()
            } else {
                vec![outer]
            };
            for node in members {
                if node.is_virtual() || node.mode.is_skipped() {
                    continue;
                }
                output.insert(node.id.to_string(), self.flatten_node(graph, node));
            }
        }

        let pruned_inputs = if self.clean { output.prune_dangling() } else { 0 };
        CompilationCompleted {
            graph_nodes: graph.len(),
            emitted_nodes: output.len(),
            pruned_inputs,
        }
        .log();

        Ok(CompiledJob {
            output,
            workflow,
            workflow_node_ids: graph.nodes().iter().map(|n| n.id.clone()).collect(),
        })
    }

    fn flatten_node(&self, graph: &Graph, node: &Node) -> JobNode {
        let mut inputs = BTreeMap::new();

        for widget in node.widgets.iter().filter(|w| w.serialize) {
            inputs.insert(widget.name.clone(), InputValue::Literal(widget.serialized_value(node)));
        }

        // A resolved link overrides a widget of the same name
        for input in &node.inputs {
            let Some(link_id) = input.link else {
                continue;
            };
            match resolver::resolve_input(graph, link_id, &input.slot_type) {
                Some(link) => {
                    inputs.insert(input.name.clone(), InputValue::Link(link));
                }
                None => InputUnresolved {
                    node_id: &node.id.to_string(),
                    input: &input.name,
                }
                .log(),
            }
        }

        JobNode {
            inputs,
            class_type: node.type_name.clone(),
            meta: self.dev_mode.then(|| JobNodeMeta {
                title: node.title.clone().unwrap_or_else(|| node.type_name.clone()),
            }),
        }
    }
}

fn expanded_ids(graph: &Graph, outer: &NodeId) -> Vec<NodeId> {
    match graph.node(outer) {
        Some(node) if node.is_composite() => node.inner_nodes.iter().map(|n| n.id.clone()).collect(),
        Some(node) => vec![node.id.clone()],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeMode, PrimitiveSource, Reroute, Widget, WidgetBehavior};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_graph() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(
            Node::new(1, "CheckpointLoader")
                .with_output("MODEL", "MODEL")
                .with_output("VAE", "VAE")
                .with_widget(Widget::new("ckpt_name", json!("sd15.safetensors"))),
        );
        graph.add_node(
            Node::new(2, "KSampler")
                .with_input("model", "MODEL")
                .with_output("LATENT", "LATENT")
                .with_widget(Widget::new("seed", json!(7)))
                .with_widget(Widget::new("steps", json!(20))),
        );
        graph.add_node(
            Node::new(3, "Reroute")
                .with_input("", "*")
                .with_output("", "*")
                .with_virtual_behavior(Arc::new(Reroute)),
        );
        graph.add_node(
            Node::new(4, "VAEDecode")
                .with_input("samples", "LATENT")
                .with_input("vae", "VAE")
                .with_output("IMAGE", "IMAGE"),
        );
        graph.add_node(Node::new(5, "Preview").with_mode(NodeMode::Muted).with_input("images", "IMAGE"));
        graph.add_node(Node::new(6, "Note").with_widget(Widget::new("text", json!("hi")).hidden()));

        graph.connect(&1.into(), 0, &2.into(), 0).unwrap();
        graph.connect(&1.into(), 1, &3.into(), 0).unwrap();
        graph.connect(&2.into(), 0, &4.into(), 0).unwrap();
        graph.connect(&3.into(), 0, &4.into(), 1).unwrap();
        graph.connect(&4.into(), 0, &5.into(), 0).unwrap();
        graph
    }

    fn keys(job: &JobDescription) -> Vec<&str> {
        job.keys().map(String::as_str).collect()
    }

    #[test]
    fn emits_exactly_the_normal_executable_nodes() {
        let mut graph = sample_graph();
        let job = GraphCompiler::new().compile(&mut graph).unwrap();
        assert_eq!(keys(&job.output), vec!["1", "2", "4", "6"]);
        assert!(job.output.get("6").unwrap().inputs.is_empty());
    }

    #[test]
    fn bypassed_middle_node_links_downstream_to_its_source() {
        let mut graph = Graph::new();
        graph.add_node(Node::new("a", "Source").with_output("IMAGE", "IMAGE"));
        graph.add_node(
            Node::new("b", "Filter")
                .with_mode(NodeMode::Bypass)
                .with_input("image", "IMAGE")
                .with_output("IMAGE", "IMAGE"),
        );
        graph.add_node(Node::new("c", "Sink").with_input("image", "IMAGE"));
        graph.connect(&"a".into(), 0, &"b".into(), 0).unwrap();
        graph.connect(&"b".into(), 0, &"c".into(), 0).unwrap();

        let job = GraphCompiler::new().compile(&mut graph).unwrap();

        assert_eq!(keys(&job.output), vec!["a", "c"]);
        assert_eq!(
            job.output.get("c").unwrap().inputs["image"],
            InputValue::Link(LinkRef("a".into(), 0))
        );
    }

    #[test]
    fn reroutes_resolve_and_widgets_serialize() {
        let mut graph = sample_graph();
        let job = GraphCompiler::new().compile(&mut graph).unwrap();

        let decode = &job.output.get("4").unwrap().inputs;
        assert_eq!(decode["vae"], InputValue::Link(LinkRef("1".into(), 1)));
        assert_eq!(decode["samples"], InputValue::Link(LinkRef("2".into(), 0)));

        let sampler = &job.output.get("2").unwrap().inputs;
        assert_eq!(sampler["seed"], InputValue::Literal(json!(7)));
        assert_eq!(sampler["steps"], InputValue::Literal(json!(20)));
    }

    #[test]
    fn no_link_reference_dangles() {
        let mut graph = sample_graph();
        // Link from a muted node survives resolution but must be pruned
        graph.node_mut(&1.into()).unwrap().mode = NodeMode::Muted;
        let job = GraphCompiler::new().compile(&mut graph).unwrap();

        for (_, node) in job.output.iter() {
            for input in node.inputs.values() {
                if let InputValue::Link(link) = input {
                    assert!(job.output.contains(link.origin_id()));
                }
            }
        }
        assert!(!job.output.get("2").unwrap().inputs.contains_key("model"));
    }

    #[test]
    fn compiling_twice_is_idempotent() {
        let mut graph = sample_graph();
        let compiler = GraphCompiler::new();
        let first = compiler.compile(&mut graph).unwrap();
        let second = compiler.compile(&mut graph).unwrap();
        assert_eq!(first.output, second.output);
        assert_eq!(
            serde_json::to_string(&first.output).unwrap(),
            serde_json::to_string(&second.output).unwrap()
        );
    }

    #[test]
    fn serialized_graph_compiles_like_the_original() {
        let mut graph = sample_graph();
        let snapshot = serde_json::to_value(&graph).unwrap();
        let mut restored = Graph::from_json(snapshot).unwrap();
        crate::graph::BehaviorRegistry::with_builtins().attach(&mut restored);

        let compiler = GraphCompiler::new();
        assert_eq!(
            compiler.compile(&mut graph).unwrap().output,
            compiler.compile(&mut restored).unwrap().output
        );
    }

    #[test]
    fn primitive_value_reaches_converted_widget() {
        let mut graph = Graph::new();
        graph.add_node(
            Node::new(1, "PrimitiveNode")
                .with_output("INT", "INT")
                .with_widget(Widget::new("value", json!(1234)))
                .with_virtual_behavior(Arc::new(PrimitiveSource)),
        );
        graph.add_node(
            Node::new(2, "KSampler")
                .with_input("seed", "INT")
                .with_widget(Widget::new("seed", json!(0))),
        );
        graph.connect(&1.into(), 0, &2.into(), 0).unwrap();

        let job = GraphCompiler::new().compile(&mut graph).unwrap();

        assert_eq!(keys(&job.output), vec!["2"]);
        assert_eq!(job.output.get("2").unwrap().inputs["seed"], InputValue::Literal(json!(1234)));
    }

    #[test]
    fn composite_nodes_expand_to_inner_nodes() {
        #[derive(Debug, Default)]
        struct CountingHook(AtomicUsize);
        impl WidgetBehavior for CountingHook {
            fn before_queued(&self, _value: &mut serde_json::Value) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let hook = Arc::new(CountingHook::default());

        let mut graph = Graph::new();
        graph.add_node(Node::new(1, "Loader").with_output("MODEL", "MODEL"));
        graph.add_node(Node::new(7, "workflow/pair").with_inner_nodes(vec![
            Node::new("7:0", "Sampler")
                .with_input("model", "MODEL")
                .with_widget(Widget::new("seed", json!(1)).with_behavior(hook.clone())),
            Node::new("7:1", "Preview").with_mode(NodeMode::Muted),
        ]));
        graph.connect(&1.into(), 0, &"7:0".into(), 0).unwrap();

        let job = GraphCompiler::new().compile(&mut graph).unwrap();

        assert_eq!(keys(&job.output), vec!["1", "7:0"]);
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
        assert_eq!(job.workflow_node_ids, vec![NodeId::Int(1), NodeId::Int(7)]);
    }

    #[test]
    fn dev_mode_titles_nodes() {
        let mut graph = Graph::new();
        graph.add_node(Node::new(1, "SaveImage").with_title("Final"));
        graph.add_node(Node::new(2, "PreviewImage"));

        let job = GraphCompiler::new().with_dev_mode(true).compile(&mut graph).unwrap();
        assert_eq!(job.output.get("1").unwrap().meta.as_ref().unwrap().title, "Final");
        assert_eq!(job.output.get("2").unwrap().meta.as_ref().unwrap().title, "PreviewImage");
    }

    #[test]
    fn cleanup_can_be_disabled() {
        let mut graph = sample_graph();
        graph.node_mut(&1.into()).unwrap().mode = NodeMode::Muted;
        let job = GraphCompiler::new().without_cleanup().compile(&mut graph).unwrap();
        assert_eq!(
            job.output.get("2").unwrap().inputs["model"],
            InputValue::Link(LinkRef("1".into(), 0))
        );
    }
}
