// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph flattening.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A graph was flattened into a job description.
///
/// # Log Level
/// `debug!` - Diagnostic detail
///
/// # Example
/// ```
/// use dagwood_client::observability::messages::compiler::CompilationCompleted;
///
/// let msg = CompilationCompleted {
///     graph_nodes: 6,
///     emitted_nodes: 4,
///     pruned_inputs: 1,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct CompilationCompleted {
    pub graph_nodes: usize,
    pub emitted_nodes: usize,
    pub pruned_inputs: usize,
}

impl Display for CompilationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Compiled {} graph nodes into {} job nodes ({} dangling inputs pruned)",
            self.graph_nodes, self.emitted_nodes, self.pruned_inputs
        )
    }
}

impl StructuredLog for CompilationCompleted {
    fn log(&self) {
        tracing::debug!(
            graph_nodes = self.graph_nodes,
            emitted_nodes = self.emitted_nodes,
            pruned_inputs = self.pruned_inputs,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "compilation",
            span_name = name,
            graph_nodes = self.graph_nodes,
        )
    }
}

/// A linked input could not be traced to an executable source and was omitted.
///
/// # Log Level
/// `debug!` - Expected for inputs fed only by bypassed or virtual nodes
pub struct InputUnresolved<'a> {
    pub node_id: &'a str,
    pub input: &'a str,
}

impl Display for InputUnresolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Input '{}' of node {} has no executable source, omitting",
            self.input, self.node_id
        )
    }
}

impl StructuredLog for InputUnresolved<'_> {
    fn log(&self) {
        tracing::debug!(node_id = self.node_id, input = self.input, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("input_unresolved", span_name = name, node_id = self.node_id)
    }
}

/// The graph contains a cycle; the nodes on it were appended in insertion order.
///
/// # Log Level
/// `warn!` - The engine will likely reject the job
pub struct CyclicExecutionOrder {
    pub nodes_on_cycle: usize,
}

impl Display for CyclicExecutionOrder {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph contains a cycle, {} nodes ordered by insertion instead",
            self.nodes_on_cycle
        )
    }
}

impl StructuredLog for CyclicExecutionOrder {
    fn log(&self) {
        tracing::warn!(nodes_on_cycle = self.nodes_on_cycle, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("cyclic_execution_order", span_name = name)
    }
}
