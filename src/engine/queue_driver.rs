// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single-flight submission queue.
//!
//! Callers hand [`QueueRequest`]s to [`QueueDriver::submit`]. While nothing is
//! in flight the call starts a drain loop; otherwise the request is buffered
//! and picked up by the loop already running. Requests drain in FIFO order
//! and each job is submitted only after the previous one was answered.
//!
//! ```text
//!   submit ──► pending (FIFO) ──► drain loop ──► compile ──► JobSubmitter
//!                                     │                          │
//!                                     │        accepted ◄────────┤
//!                                     │   (ledger + after_queued) │
//!                                     │        rejected ◄────────┘
//!                                     │   (last error, rest of batch skipped)
//!                                     ▼
//!                        graph redraw per job, promptQueued at the end
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::client::types::{NodeErrors, QueuePlacement, QueuePromptRequest};
use crate::compiler::GraphCompiler;
use crate::engine::jobs::JobLedger;
use crate::engine::SharedGraph;
use crate::errors::{CompileError, SubmissionError};
use crate::events::{ClientEvent, EventBus};
use crate::observability::messages::queue::{
    QueueDrained, RequestBuffered, SubmissionAccepted, SubmissionFailed, SubmissionStarted,
};
use crate::observability::messages::StructuredLog;
use crate::session::SessionIdentity;
use crate::traits::JobSubmitter;

/// One call to queue the current graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueRequest {
    /// `< 0` queues at the engine's head, `0` appends, anything else is an explicit position
    pub priority: i64,
    /// How many jobs to submit, at least one
    pub repeat_count: u32,
}

impl QueueRequest {
    pub fn new(priority: i64, repeat_count: u32) -> Self {
        Self {
            priority,
            repeat_count: repeat_count.max(1),
        }
    }
}

/// The most recent submission failure.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionFailure {
    pub message: String,
    pub node_errors: Option<NodeErrors>,
}

#[derive(Debug, Default)]
struct DriverState {
    pending: VecDeque<QueueRequest>,
    processing: bool,
    last_failure: Option<SubmissionFailure>,
}

struct Inner {
    graph: SharedGraph,
    submitter: Arc<dyn JobSubmitter>,
    identity: SessionIdentity,
    bus: EventBus,
    ledger: JobLedger,
    compiler: GraphCompiler,
    state: Mutex<DriverState>,
    busy: watch::Sender<bool>,
}

/// Serializes job submission: at most one job in flight, FIFO across requests.
///
/// Cloning is cheap and clones drive the same queue.
#[derive(Clone)]
pub struct QueueDriver {
    inner: Arc<Inner>,
}

#[derive(Debug, Default, Clone, Copy)]
struct DrainTally {
    submitted: usize,
    failed: usize,
}

impl QueueDriver {
    pub fn new(
        graph: SharedGraph,
        submitter: Arc<dyn JobSubmitter>,
        identity: SessionIdentity,
        bus: EventBus,
        ledger: JobLedger,
        compiler: GraphCompiler,
    ) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                graph,
                submitter,
                identity,
                bus,
                ledger,
                compiler,
                state: Mutex::new(DriverState::default()),
                busy,
            }),
        }
    }

    /// Queue the current graph `request.repeat_count` times.
    ///
    /// If a drain loop is already running the request is buffered and this
    /// returns `false` immediately. Otherwise this call runs the loop until
    /// the buffer is empty and returns `true`. The loop runs on its own task,
    /// so dropping the returned future does not stall the queue.
    pub async fn submit(&self, request: QueueRequest) -> bool {
        let request = QueueRequest::new(request.priority, request.repeat_count);
        {
            let mut state = self.lock();
            state.pending.push_back(request);
            if state.processing {
                RequestBuffered {
                    priority: request.priority,
                    repeat_count: request.repeat_count,
                    pending: state.pending.len(),
                }
                .log();
                return false;
            }
            state.processing = true;
            self.inner.busy.send_replace(true);
        }

        let driver = self.clone();
        let drain = tokio::spawn(async move { driver.drain(request).await });
        if let Err(e) = drain.await {
            tracing::error!(error = %e, "Queue drain task ended abnormally");
            let mut state = self.lock();
            state.processing = false;
            self.inner.busy.send_replace(false);
        }
        true
    }

    /// Whether a drain loop is running.
    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    /// Requests buffered behind the job in flight.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// The failure recorded by the most recent submission, cleared by the next success.
    pub fn last_failure(&self) -> Option<SubmissionFailure> {
        self.lock().last_failure.clone()
    }

    /// Per-node errors of the most recent failed submission.
    pub fn last_node_errors(&self) -> Option<NodeErrors> {
        self.lock().last_failure.as_ref().and_then(|f| f.node_errors.clone())
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.inner.ledger
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.inner.graph
    }

    /// Wait until no drain loop is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.busy.subscribe();
        let _ = rx.wait_for(|busy| !*busy).await;
    }

    async fn drain(&self, initiating: QueueRequest) {
        let mut tally = DrainTally::default();
        loop {
            // Pop and release under one lock so a concurrent submit never
            // sees an idle driver with a non-empty buffer
            let next = {
                let mut state = self.lock();
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.processing = false;
                }
                next
            };
            let Some(request) = next else {
                break;
            };
            self.process(request, &mut tally).await;
        }

        QueueDrained {
            submitted: tally.submitted,
            failed: tally.failed,
        }
        .log();
        self.inner.bus.emit(&ClientEvent::PromptQueued {
            number: initiating.priority,
            batch_count: initiating.repeat_count,
        });

        // A submit may have started the next loop in the meantime
        let state = self.lock();
        if !state.processing {
            self.inner.busy.send_replace(false);
        }
    }

    async fn process(&self, request: QueueRequest, tally: &mut DrainTally) {
        for iteration in 0..request.repeat_count {
            let outcome = self.submit_once(request, iteration).await;
            self.inner.bus.emit(&ClientEvent::GraphRedraw);

            if let Err(error) = outcome {
                tally.failed += 1;
                SubmissionFailed {
                    error: &error,
                    skipped_repeats: request.repeat_count - iteration - 1,
                }
                .log();
                let failure = SubmissionFailure {
                    message: error.to_string(),
                    node_errors: error.node_errors().cloned(),
                };
                self.lock().last_failure = Some(failure.clone());
                self.inner.bus.emit(&ClientEvent::PromptError {
                    message: failure.message,
                    node_errors: failure.node_errors,
                });
                break;
            }
            tally.submitted += 1;
        }
    }

    async fn submit_once(&self, request: QueueRequest, iteration: u32) -> Result<(), SubmissionError> {
        // Compile under the graph lock so no edit is half-visible
        let job = {
            let mut graph = self.inner.graph.lock().await;
            self.inner.compiler.compile(&mut graph).inspect_err(compile_defect)?
        };

        SubmissionStarted {
            priority: request.priority,
            iteration,
            repeat_count: request.repeat_count,
            node_count: job.output.len(),
        }
        .log();

        let node_count = job.output.len();
        let emitted: Vec<String> = job.output.keys().cloned().collect();
        let body = QueuePromptRequest::new(
            self.inner.identity.client_id(),
            QueuePlacement::from_priority(request.priority),
            job.output,
            job.workflow,
        );
        let response = self.inner.submitter.submit(body).await?;
        if !response.node_errors.is_empty() {
            return Err(SubmissionError::NodeErrors(response.node_errors));
        }

        SubmissionAccepted {
            prompt_id: &response.prompt_id,
            node_count,
        }
        .log();
        self.lock().last_failure = None;
        self.inner
            .ledger
            .record(&response.prompt_id, response.number, emitted);
        self.inner.graph.lock().await.run_after_queued(&job.workflow_node_ids);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DriverState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A graph that fails to compile is a client defect: debug builds stop on
/// it, release builds log it and fail the current batch.
fn compile_defect(error: &CompileError) {
    tracing::error!(error = %error, "Graph compilation failed; this is a client defect");
    debug_assert!(false, "graph compilation failed: {error}");
}

impl std::fmt::Debug for QueueDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("QueueDriver")
            .field("processing", &state.processing)
            .field("pending", &state.pending.len())
            .field("last_failure", &state.last_failure)
            .finish()
    }
}
