// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::engine::jobs::{JobLedger, JobStatus};
use crate::events::{names, value_to_id, ClientEvent, EventBus, PreviewImage};

#[derive(Debug, Default)]
struct TrackerState {
    last_execution_error: Option<Value>,
    running_prompt: Option<String>,
    running_node: Option<String>,
    node_outputs: HashMap<String, Value>,
    previews: HashMap<String, PreviewImage>,
    queue_remaining: Option<u64>,
}

/// Observer state built from the live event stream.
///
/// [`ExecutionTracker::attach`] registers handlers on the bus; from then on
/// the tracker follows which job and node are running, what each node
/// produced, the latest preview, the engine's queue depth and the last
/// execution error. Lifecycle events are also applied to the [`JobLedger`].
#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    state: Arc<Mutex<TrackerState>>,
    ledger: JobLedger,
}

impl ExecutionTracker {
    pub fn attach(bus: &EventBus, ledger: JobLedger) -> Self {
        let tracker = Self {
            state: Arc::new(Mutex::new(TrackerState::default())),
            ledger,
        };
        for name in [
            names::STATUS,
            names::EXECUTION_START,
            names::EXECUTING,
            names::EXECUTED,
            names::EXECUTION_SUCCESS,
            names::EXECUTION_ERROR,
            names::PREVIEW,
        ] {
            let handler = tracker.clone();
            bus.on(name, move |event| handler.observe(event));
        }
        tracker
    }

    /// Apply one event. Events the tracker does not follow are ignored.
    pub fn observe(&self, event: &ClientEvent) {
        let mut state = self.lock();
        match event {
            ClientEvent::Status(status) => {
                state.queue_remaining = status
                    .as_ref()
                    .and_then(|s| s.pointer("/exec_info/queue_remaining"))
                    .and_then(Value::as_u64);
            }
            ClientEvent::ExecutionStart(data) => {
                state.last_execution_error = None;
                state.running_prompt = prompt_id(data);
                if let Some(id) = prompt_id(data) {
                    self.ledger.update(&id, JobStatus::Running);
                }
            }
            ClientEvent::Executing(_) => {
                state.running_node = event.executing_node();
                if state.running_node.is_none() {
                    state.running_prompt = None;
                }
            }
            ClientEvent::Executed(data) => {
                let node = data
                    .get("display_node")
                    .filter(|v| !v.is_null())
                    .or_else(|| data.get("node"))
                    .and_then(value_to_id);
                let (Some(node), Some(output)) = (node, data.get("output")) else {
                    return;
                };
                let merge = data.get("merge").and_then(Value::as_bool).unwrap_or(false);
                match state.node_outputs.get_mut(&node) {
                    Some(existing) if merge => merge_output(existing, output),
                    _ => {
                        state.node_outputs.insert(node, output.clone());
                    }
                }
            }
            ClientEvent::ExecutionSuccess(data) => {
                state.running_node = None;
                if let Some(id) = prompt_id(data) {
                    self.ledger.update(&id, JobStatus::Succeeded);
                }
            }
            ClientEvent::ExecutionError(data) => {
                state.last_execution_error = Some(data.clone());
                state.running_node = None;
                if let Some(id) = prompt_id(data) {
                    self.ledger.update(&id, JobStatus::Failed);
                }
            }
            ClientEvent::Preview(preview) => {
                if let Some(node) = state.running_node.clone() {
                    state.previews.insert(node, preview.clone());
                }
            }
            _ => {}
        }
    }

    pub fn last_execution_error(&self) -> Option<Value> {
        self.lock().last_execution_error.clone()
    }

    pub fn running_node(&self) -> Option<String> {
        self.lock().running_node.clone()
    }

    pub fn running_prompt(&self) -> Option<String> {
        self.lock().running_prompt.clone()
    }

    pub fn node_output(&self, node_id: &str) -> Option<Value> {
        self.lock().node_outputs.get(node_id).cloned()
    }

    /// Latest preview image of a node.
    pub fn preview(&self, node_id: &str) -> Option<PreviewImage> {
        self.lock().previews.get(node_id).cloned()
    }

    /// Pending jobs in the engine, as of the last status event.
    pub fn queue_remaining(&self) -> Option<u64> {
        self.lock().queue_remaining
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.ledger
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn prompt_id(data: &Value) -> Option<String> {
    data.get("prompt_id").and_then(Value::as_str).map(str::to_string)
}

// Array-valued keys are appended to, everything else is replaced
fn merge_output(existing: &mut Value, incoming: &Value) {
    let (Some(existing), Some(incoming)) = (existing.as_object_mut(), incoming.as_object()) else {
        return;
    };
    for (key, value) in incoming {
        match (existing.get_mut(key), value) {
            (Some(Value::Array(current)), Value::Array(more)) => current.extend(more.iter().cloned()),
            _ => {
                existing.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ImageFormat;
    use serde_json::json;

    fn tracker() -> (EventBus, ExecutionTracker) {
        let bus = EventBus::new();
        let tracker = ExecutionTracker::attach(&bus, JobLedger::new());
        (bus, tracker)
    }

    #[test]
    fn status_tracks_queue_remaining() {
        let (bus, tracker) = tracker();
        bus.emit(&ClientEvent::Status(Some(json!({"exec_info": {"queue_remaining": 3}}))));
        assert_eq!(tracker.queue_remaining(), Some(3));

        bus.emit(&ClientEvent::Status(None));
        assert_eq!(tracker.queue_remaining(), None);
    }

    #[test]
    fn error_is_cleared_by_the_next_start() {
        let (bus, tracker) = tracker();
        bus.emit(&ClientEvent::ExecutionError(json!({"prompt_id": "p", "node_id": "4"})));
        assert!(tracker.last_execution_error().is_some());

        bus.emit(&ClientEvent::ExecutionStart(json!({"prompt_id": "q"})));
        assert!(tracker.last_execution_error().is_none());
        assert_eq!(tracker.running_prompt().as_deref(), Some("q"));
    }

    #[test]
    fn executing_prefers_display_node_and_null_finishes() {
        let (bus, tracker) = tracker();
        bus.emit(&ClientEvent::Executing(json!({"node": 12, "display_node": 4})));
        assert_eq!(tracker.running_node().as_deref(), Some("4"));

        bus.emit(&ClientEvent::Executing(json!({"node": null})));
        assert_eq!(tracker.running_node(), None);
    }

    #[test]
    fn merged_outputs_append_arrays() {
        let (bus, tracker) = tracker();
        bus.emit(&ClientEvent::Executed(json!({
            "node": "9",
            "output": {"images": [{"filename": "a.png"}], "text": ["x"]}
        })));
        bus.emit(&ClientEvent::Executed(json!({
            "node": "9",
            "merge": true,
            "output": {"images": [{"filename": "b.png"}], "text": "y"}
        })));

        assert_eq!(
            tracker.node_output("9"),
            Some(json!({"images": [{"filename": "a.png"}, {"filename": "b.png"}], "text": "y"}))
        );

        // Without merge the output is replaced
        bus.emit(&ClientEvent::Executed(json!({"node": "9", "output": {"images": []}})));
        assert_eq!(tracker.node_output("9"), Some(json!({"images": []})));
    }

    #[test]
    fn previews_belong_to_the_running_node() {
        let (bus, tracker) = tracker();
        let preview = PreviewImage {
            format: ImageFormat::Jpeg,
            bytes: vec![1, 2, 3],
        };
        bus.emit(&ClientEvent::Preview(preview.clone()));
        assert!(tracker.preview("3").is_none());

        bus.emit(&ClientEvent::Executing(json!({"node": "3"})));
        bus.emit(&ClientEvent::Preview(preview.clone()));
        assert_eq!(tracker.preview("3"), Some(preview));
    }

    #[test]
    fn lifecycle_events_update_the_ledger() {
        let (bus, tracker) = tracker();
        tracker.ledger().record("p1", Some(0), vec![]);
        tracker.ledger().record("p2", Some(1), vec![]);

        bus.emit(&ClientEvent::ExecutionStart(json!({"prompt_id": "p1"})));
        assert_eq!(tracker.ledger().get("p1").unwrap().status, JobStatus::Running);

        bus.emit(&ClientEvent::ExecutionSuccess(json!({"prompt_id": "p1"})));
        bus.emit(&ClientEvent::ExecutionError(json!({"prompt_id": "p2"})));
        assert_eq!(tracker.ledger().get("p1").unwrap().status, JobStatus::Succeeded);
        assert_eq!(tracker.ledger().get("p2").unwrap().status, JobStatus::Failed);
        assert_eq!(tracker.ledger().outstanding(), 0);
    }
}
