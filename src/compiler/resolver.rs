// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Upstream walk from a linked input to the node that actually produces its value.

use std::collections::HashSet;

use crate::compiler::job::LinkRef;
use crate::graph::{Graph, LinkId, Node, NodeId, NodeMode};

/// Follow `link_id` upstream through bypassed and virtual nodes.
///
/// * A virtual origin maps the requested output slot to one of its inputs via
///   [`VirtualBehavior::input_for_output`](crate::graph::VirtualBehavior::input_for_output).
/// * A bypassed origin forwards the first of its inputs whose type equals
///   `input_type`, trying the slot matching the requested output first.
///
/// Any other origin ends the walk and becomes the reference, even a muted one
/// (muted nodes are not emitted, so the reference is pruned afterwards).
///
/// Returns `None` when the chain ends without a source. Revisiting an
/// `(origin, slot)` pair also ends the walk with `None`, so cyclic reroute
/// chains terminate.
pub(crate) fn resolve_input(graph: &Graph, link_id: LinkId, input_type: &str) -> Option<LinkRef> {
    let mut link = graph.link(link_id)?;
    let mut visited: HashSet<(&NodeId, usize)> = HashSet::new();

    loop {
        let parent = graph.find_node(&link.origin_id)?;
        if !passes_through(parent) {
            return Some(LinkRef(link.origin_id.to_string(), link.origin_slot));
        }
        if !visited.insert((&link.origin_id, link.origin_slot)) {
            return None;
        }

        let next_slot = match &parent.virtual_behavior {
            Some(behavior) => behavior.input_for_output(link.origin_slot)?,
            None => bypass_candidates(parent, link.origin_slot)
                .find(|slot| parent.inputs.get(*slot).is_some_and(|input| input.slot_type == input_type))?,
        };
        link = graph.link(parent.input_link(next_slot)?)?;
    }
}

fn passes_through(node: &Node) -> bool {
    node.is_virtual() || node.mode == NodeMode::Bypass
}

fn bypass_candidates(node: &Node, preferred: usize) -> impl Iterator<Item = usize> {
    std::iter::once(preferred).chain(0..node.inputs.len())
}
