// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory editor graph: nodes, slots, links and widgets.
//!
//! The graph is what the caller edits and what the
//! [`GraphCompiler`](crate::compiler::GraphCompiler) flattens into a job.
//! Frontend-only behavior (virtual nodes, widget hooks) is attached through
//! the traits in [`behaviors`] and never serialized.

pub mod behaviors;
mod order;
pub mod types;
mod value_control;
mod workflow;

pub use behaviors::{BehaviorRegistry, PrimitiveSource, Reroute, VirtualBehavior, WidgetBehavior};
pub use order::execution_order;
pub use types::{InputSlot, Link, LinkId, Node, NodeId, NodeMode, OutputSlot, Widget};
pub use value_control::{ControlMode, ValueControl};
pub use workflow::Graph;
