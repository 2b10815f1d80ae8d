// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Node-level building blocks of a [`Graph`](crate::graph::Graph).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::behaviors::{VirtualBehavior, WidgetBehavior};

/// Stable node identifier. Editors hand out integers; composite nodes and
/// imported graphs may use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Str(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(id) => write!(f, "{}", id),
            NodeId::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        NodeId::Int(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::Str(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId::Str(id)
    }
}

pub type LinkId = u64;

/// Whether a node takes part in execution.
///
/// Serialized as the editor's numeric mode: `0` normal, `2` never (muted),
/// `4` bypass. The editor's event-driven modes `1` and `3` execute normally
/// as far as job submission is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NodeMode {
    #[default]
    Normal,
    Muted,
    Bypass,
}

impl NodeMode {
    /// Skipped nodes are never emitted into a job.
    pub fn is_skipped(&self) -> bool {
        !matches!(self, NodeMode::Normal)
    }
}

impl TryFrom<u8> for NodeMode {
    type Error = String;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            0 | 1 | 3 => Ok(NodeMode::Normal),
            2 => Ok(NodeMode::Muted),
            4 => Ok(NodeMode::Bypass),
            other => Err(format!("unknown node mode {}", other)),
        }
    }
}

impl From<NodeMode> for u8 {
    fn from(mode: NodeMode) -> Self {
        match mode {
            NodeMode::Normal => 0,
            NodeMode::Muted => 2,
            NodeMode::Bypass => 4,
        }
    }
}

/// Directed edge `(origin_id, origin_slot) -> (target_id, target_slot)`.
///
/// Serialized as the editor's positional array
/// `[id, origin_id, origin_slot, target_id, target_slot, type]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LinkTuple", into = "LinkTuple")]
pub struct Link {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: usize,
    pub target_id: NodeId,
    pub target_slot: usize,
    pub link_type: String,
}

type LinkTuple = (LinkId, NodeId, usize, NodeId, usize, String);

impl From<LinkTuple> for Link {
    fn from((id, origin_id, origin_slot, target_id, target_slot, link_type): LinkTuple) -> Self {
        Self { id, origin_id, origin_slot, target_id, target_slot, link_type }
    }
}

impl From<Link> for LinkTuple {
    fn from(link: Link) -> Self {
        (link.id, link.origin_id, link.origin_slot, link.target_id, link.target_slot, link.link_type)
    }
}

/// Typed input slot, bound to at most one incoming link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSlot {
    pub name: String,
    #[serde(rename = "type")]
    pub slot_type: String,
    #[serde(default)]
    pub link: Option<LinkId>,
}

/// Typed output slot, fanning out to any number of links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSlot {
    pub name: String,
    #[serde(rename = "type")]
    pub slot_type: String,
    #[serde(default)]
    pub links: Vec<LinkId>,
}

/// Named editable value on a node.
///
/// A widget whose name matches an input slot has been converted to an input:
/// when that input resolves to a link, the link wins over the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    pub name: String,
    pub value: Value,
    /// `false` keeps the widget out of compiled jobs entirely
    #[serde(default = "default_serialize", skip_serializing_if = "is_default_serialize")]
    pub serialize: bool,
    #[serde(skip)]
    pub behavior: Option<Arc<dyn WidgetBehavior>>,
}

fn default_serialize() -> bool {
    true
}

fn is_default_serialize(serialize: &bool) -> bool {
    *serialize
}

impl Widget {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            serialize: true,
            behavior: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.serialize = false;
        self
    }

    pub fn with_behavior(mut self, behavior: Arc<dyn WidgetBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Value as it goes into a compiled job, honoring the behavior's override.
    pub fn serialized_value(&self, node: &Node) -> Value {
        self.behavior
            .as_ref()
            .and_then(|behavior| behavior.serialize_value(node, &self.value))
            .unwrap_or_else(|| self.value.clone())
    }
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value && self.serialize == other.serialize
    }
}

/// A node in the editor graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub mode: NodeMode,
    #[serde(default)]
    pub inputs: Vec<InputSlot>,
    #[serde(default)]
    pub outputs: Vec<OutputSlot>,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    /// Nodes a composite node expands to when compiled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inner_nodes: Vec<Node>,
    /// Present on frontend-only nodes that never execute remotely
    #[serde(skip)]
    pub virtual_behavior: Option<Arc<dyn VirtualBehavior>>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            title: None,
            mode: NodeMode::Normal,
            inputs: Vec::new(),
            outputs: Vec::new(),
            widgets: Vec::new(),
            inner_nodes: Vec::new(),
            virtual_behavior: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_mode(mut self, mode: NodeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, slot_type: impl Into<String>) -> Self {
        self.inputs.push(InputSlot {
            name: name.into(),
            slot_type: slot_type.into(),
            link: None,
        });
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, slot_type: impl Into<String>) -> Self {
        self.outputs.push(OutputSlot {
            name: name.into(),
            slot_type: slot_type.into(),
            links: Vec::new(),
        });
        self
    }

    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }

    pub fn with_inner_nodes(mut self, inner_nodes: Vec<Node>) -> Self {
        self.inner_nodes = inner_nodes;
        self
    }

    pub fn with_virtual_behavior(mut self, behavior: Arc<dyn VirtualBehavior>) -> Self {
        self.virtual_behavior = Some(behavior);
        self
    }

    pub fn is_virtual(&self) -> bool {
        self.virtual_behavior.is_some()
    }

    pub fn is_composite(&self) -> bool {
        !self.inner_nodes.is_empty()
    }

    pub fn input_link(&self, slot: usize) -> Option<LinkId> {
        self.inputs.get(slot).and_then(|input| input.link)
    }

    pub fn widget(&self, name: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.name == name)
    }

    pub fn widget_mut(&mut self, name: &str) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.name == name)
    }
}
