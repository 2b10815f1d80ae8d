// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the submission queue.
//!
//! This module contains message types for logging events related to:
//! * Queue request buffering and draining
//! * Individual submissions and engine acceptance
//! * Engine-reported validation errors and transport-level rejections

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A request was buffered behind an in-flight submission.
///
/// # Log Level
/// `debug!` - Diagnostic detail
///
/// # Example
/// ```
/// use dagwood_client::observability::messages::queue::RequestBuffered;
///
/// let msg = RequestBuffered {
///     priority: 0,
///     repeat_count: 2,
///     pending: 1,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct RequestBuffered {
    pub priority: i64,
    pub repeat_count: u32,
    pub pending: usize,
}

impl Display for RequestBuffered {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Buffered queue request (priority={}, repeat={}), {} pending",
            self.priority, self.repeat_count, self.pending
        )
    }
}

impl StructuredLog for RequestBuffered {
    fn log(&self) {
        tracing::debug!(
            priority = self.priority,
            repeat_count = self.repeat_count,
            pending = self.pending,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("queue_request", span_name = name, priority = self.priority)
    }
}

/// One iteration of a queue request is about to be submitted.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct SubmissionStarted {
    pub priority: i64,
    pub iteration: u32,
    pub repeat_count: u32,
    pub node_count: usize,
}

impl Display for SubmissionStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Submitting job {}/{} with {} nodes (priority={})",
            self.iteration + 1,
            self.repeat_count,
            self.node_count,
            self.priority
        )
    }
}

impl StructuredLog for SubmissionStarted {
    fn log(&self) {
        tracing::debug!(
            priority = self.priority,
            iteration = self.iteration,
            repeat_count = self.repeat_count,
            node_count = self.node_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "submission",
            span_name = name,
            priority = self.priority,
            iteration = self.iteration,
        )
    }
}

/// The engine accepted a job.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use dagwood_client::observability::messages::queue::SubmissionAccepted;
///
/// let msg = SubmissionAccepted {
///     prompt_id: "0f9c",
///     node_count: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct SubmissionAccepted<'a> {
    pub prompt_id: &'a str,
    pub node_count: usize,
}

impl Display for SubmissionAccepted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Engine accepted job '{}' ({} nodes)",
            self.prompt_id, self.node_count
        )
    }
}

impl StructuredLog for SubmissionAccepted<'_> {
    fn log(&self) {
        tracing::info!(
            prompt_id = self.prompt_id,
            node_count = self.node_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("submission_accepted", span_name = name, prompt_id = self.prompt_id)
    }
}

/// A submission failed, either by engine validation or at the transport level.
/// The rest of the current batch is skipped.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct SubmissionFailed<'a> {
    pub error: &'a dyn std::error::Error,
    pub skipped_repeats: u32,
}

impl Display for SubmissionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Job submission failed, skipping {} remaining repeats: {}",
            self.skipped_repeats, self.error
        )
    }
}

impl StructuredLog for SubmissionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            error = %self.error,
            skipped_repeats = self.skipped_repeats,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("submission_failed", span_name = name, error = %self.error)
    }
}

/// The queue drained and the processing loop exited.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct QueueDrained {
    pub submitted: usize,
    pub failed: usize,
}

impl Display for QueueDrained {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Queue drained: {} jobs submitted, {} failed",
            self.submitted, self.failed
        )
    }
}

impl StructuredLog for QueueDrained {
    fn log(&self) {
        tracing::debug!(submitted = self.submitted, failed = self.failed, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("queue_drained", span_name = name)
    }
}
