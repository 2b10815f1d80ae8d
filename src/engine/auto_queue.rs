// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{AutoQueueMode, AutoQueueSettings};
use crate::engine::{ExecutionTracker, QueueDriver, QueueRequest};
use crate::events::{names, ClientEvent, EventBus};

#[derive(Debug, Default)]
struct Watch {
    /// Engine pending count as last reported, bumped by our own triggers
    pending: u64,
    graph_changed: bool,
}

/// Re-queues the graph on its own.
///
/// * `instant`: whenever the engine's pending count drops to zero and the
///   last execution did not fail.
/// * `change`: on every graph change while the engine is idle. A change seen
///   while jobs are pending is remembered and queued once the count reaches zero.
///
/// Bus handlers only decide; submissions happen on a task owned by this value
/// and stop when it is dropped.
#[derive(Debug)]
pub struct AutoQueue {
    task: JoinHandle<()>,
}

impl AutoQueue {
    /// Start watching `bus`. Returns `None` when the mode is disabled.
    pub fn start(
        settings: AutoQueueSettings,
        bus: &EventBus,
        driver: QueueDriver,
        tracker: ExecutionTracker,
    ) -> Option<Self> {
        if settings.mode == AutoQueueMode::Disabled {
            return None;
        }
        let (trigger, mut triggers) = mpsc::unbounded_channel::<()>();
        let watch = Arc::new(Mutex::new(Watch::default()));

        if settings.mode == AutoQueueMode::Change {
            let watch = Arc::clone(&watch);
            let trigger = trigger.clone();
            bus.on(names::GRAPH_CHANGED, move |_| {
                let mut watch = watch.lock().unwrap_or_else(|e| e.into_inner());
                if watch.pending > 0 {
                    watch.graph_changed = true;
                } else {
                    watch.graph_changed = false;
                    watch.pending += 1;
                    let _ = trigger.send(());
                }
            });
        }

        bus.on(names::STATUS, move |event| {
            let ClientEvent::Status(Some(status)) = event else {
                return;
            };
            let Some(remaining) = status.pointer("/exec_info/queue_remaining").and_then(Value::as_u64) else {
                return;
            };
            let mut watch = watch.lock().unwrap_or_else(|e| e.into_inner());
            if watch.pending == remaining {
                return;
            }
            watch.pending = remaining;
            if remaining > 0 || tracker.last_execution_error().is_some() {
                return;
            }
            if settings.mode == AutoQueueMode::Instant || watch.graph_changed {
                watch.graph_changed = false;
                let _ = trigger.send(());
            }
        });

        let batch_count = settings.batch_count;
        let task = tokio::spawn(async move {
            while triggers.recv().await.is_some() {
                tracing::debug!(batch_count, "Auto queue triggered");
                driver.submit(QueueRequest::new(0, batch_count)).await;
            }
        });
        Some(Self { task })
    }
}

impl Drop for AutoQueue {
    fn drop(&mut self) {
        self.task.abort();
    }
}
