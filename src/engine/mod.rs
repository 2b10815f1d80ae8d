// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Submission side of the client: the single-flight [`QueueDriver`], the
//! [`ExecutionTracker`] that follows jobs over the live channel, and the
//! optional [`AutoQueue`].

mod auto_queue;
mod jobs;
mod queue_driver;
mod tracker;


use std::sync::Arc;

use crate::graph::Graph;

pub use auto_queue::AutoQueue;
pub use jobs::{JobLedger, JobStatus, SubmittedJob};
pub use queue_driver::{QueueDriver, QueueRequest, SubmissionFailure};
pub use tracker::ExecutionTracker;

/// The editor graph, shared between its owner and the queue driver.
///
/// Compilation holds the lock for its whole duration, so edits made through
/// the same lock are never seen half-applied.
pub type SharedGraph = Arc<tokio::sync::Mutex<Graph>>;

/// Wrap a graph for sharing.
pub fn share(graph: Graph) -> SharedGraph {
    Arc::new(tokio::sync::Mutex::new(graph))
}
