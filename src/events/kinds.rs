// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Event kinds published on the [`EventBus`](crate::events::EventBus).
//!
//! The engine pushes a fixed set of lifecycle messages over the live channel;
//! each has its own variant. The client adds its own notifications
//! (reconnect, redraw, queue results) and [`ClientEvent::Custom`] carries any
//! other server-pushed message type an observer registered for explicitly.

use serde_json::Value;

use crate::client::types::NodeErrors;

/// Event names as they appear on the wire and on the bus.
pub mod names {
    pub const STATUS: &str = "status";
    pub const PROGRESS: &str = "progress";
    pub const EXECUTING: &str = "executing";
    pub const EXECUTED: &str = "executed";
    pub const EXECUTION_START: &str = "execution_start";
    pub const EXECUTION_SUCCESS: &str = "execution_success";
    pub const EXECUTION_ERROR: &str = "execution_error";
    pub const EXECUTION_CACHED: &str = "execution_cached";
    pub const DOWNLOAD_PROGRESS: &str = "download_progress";
    pub const PREVIEW: &str = "b_preview";
    pub const RECONNECTING: &str = "reconnecting";
    pub const RECONNECTED: &str = "reconnected";
    pub const PROMPT_QUEUED: &str = "promptQueued";
    pub const PROMPT_ERROR: &str = "promptError";
    pub const GRAPH_REDRAW: &str = "graphRedraw";
    pub const GRAPH_CHANGED: &str = "graphChanged";

    /// Names the client publishes itself. The engine never owns these.
    pub fn is_client_local(name: &str) -> bool {
        matches!(
            name,
            PREVIEW | RECONNECTING | RECONNECTED | PROMPT_QUEUED | PROMPT_ERROR | GRAPH_REDRAW | GRAPH_CHANGED
        )
    }
}

/// Image encodings a preview frame can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Map a wire format code. Unrecognized codes are treated as JPEG.
    pub fn from_code(code: Option<u32>) -> Self {
        match code {
            Some(2) => ImageFormat::Png,
            _ => ImageFormat::Jpeg,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// A preview image streamed while a node executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Everything that can be published on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Engine queue status. `None` while the engine is unreachable.
    Status(Option<Value>),
    Progress(Value),
    Executing(Value),
    Executed(Value),
    ExecutionStart(Value),
    ExecutionSuccess(Value),
    ExecutionError(Value),
    ExecutionCached(Value),
    DownloadProgress(Value),
    Preview(PreviewImage),
    Reconnecting,
    Reconnected,
    /// The queue driver drained the requests that were buffered by a submit call.
    PromptQueued { number: i64, batch_count: u32 },
    /// A submission failed; `message` is the formatted aggregation.
    PromptError {
        message: String,
        node_errors: Option<NodeErrors>,
    },
    /// Observers should refresh their view of the graph.
    GraphRedraw,
    /// The editor changed the graph.
    GraphChanged,
    /// Server-pushed message type outside the fixed set.
    Custom { name: String, data: Value },
}

impl ClientEvent {
    /// Map one of the fixed engine message types to its variant.
    /// Returns `None` for anything outside the fixed set.
    pub fn from_server(kind: &str, data: Value) -> Option<Self> {
        let event = match kind {
            names::STATUS => ClientEvent::Status(match data {
                Value::Null => None,
                other => Some(other),
            }),
            names::PROGRESS => ClientEvent::Progress(data),
            names::EXECUTING => ClientEvent::Executing(data),
            names::EXECUTED => ClientEvent::Executed(data),
            names::EXECUTION_START => ClientEvent::ExecutionStart(data),
            names::EXECUTION_SUCCESS => ClientEvent::ExecutionSuccess(data),
            names::EXECUTION_ERROR => ClientEvent::ExecutionError(data),
            names::EXECUTION_CACHED => ClientEvent::ExecutionCached(data),
            names::DOWNLOAD_PROGRESS => ClientEvent::DownloadProgress(data),
            _ => return None,
        };
        Some(event)
    }

    /// The bus name handlers register under.
    pub fn name(&self) -> &str {
        match self {
            ClientEvent::Status(_) => names::STATUS,
            ClientEvent::Progress(_) => names::PROGRESS,
            ClientEvent::Executing(_) => names::EXECUTING,
            ClientEvent::Executed(_) => names::EXECUTED,
            ClientEvent::ExecutionStart(_) => names::EXECUTION_START,
            ClientEvent::ExecutionSuccess(_) => names::EXECUTION_SUCCESS,
            ClientEvent::ExecutionError(_) => names::EXECUTION_ERROR,
            ClientEvent::ExecutionCached(_) => names::EXECUTION_CACHED,
            ClientEvent::DownloadProgress(_) => names::DOWNLOAD_PROGRESS,
            ClientEvent::Preview(_) => names::PREVIEW,
            ClientEvent::Reconnecting => names::RECONNECTING,
            ClientEvent::Reconnected => names::RECONNECTED,
            ClientEvent::PromptQueued { .. } => names::PROMPT_QUEUED,
            ClientEvent::PromptError { .. } => names::PROMPT_ERROR,
            ClientEvent::GraphRedraw => names::GRAPH_REDRAW,
            ClientEvent::GraphChanged => names::GRAPH_CHANGED,
            ClientEvent::Custom { name, .. } => name,
        }
    }

    /// Node currently executing, for `executing` events.
    ///
    /// Prefers `display_node` over `node`. `None` when execution finished.
    pub fn executing_node(&self) -> Option<String> {
        let ClientEvent::Executing(data) = self else {
            return None;
        };
        let node = match data.get("display_node") {
            Some(v) if !v.is_null() => v,
            _ => data.get("node")?,
        };
        value_to_id(node)
    }
}

/// Node ids arrive as strings or numbers depending on the engine version.
pub(crate) fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixed_names_round_trip_through_from_server() {
        for name in [
            names::STATUS,
            names::PROGRESS,
            names::EXECUTING,
            names::EXECUTED,
            names::EXECUTION_START,
            names::EXECUTION_SUCCESS,
            names::EXECUTION_ERROR,
            names::EXECUTION_CACHED,
            names::DOWNLOAD_PROGRESS,
        ] {
            let event = ClientEvent::from_server(name, json!({"x": 1})).unwrap();
            assert_eq!(event.name(), name);
        }
        assert!(ClientEvent::from_server("crystools.monitor", json!({})).is_none());
    }

    #[test]
    fn null_status_maps_to_none() {
        assert_eq!(
            ClientEvent::from_server(names::STATUS, Value::Null),
            Some(ClientEvent::Status(None))
        );
    }

    #[test]
    fn executing_prefers_display_node() {
        let event = ClientEvent::Executing(json!({"node": "12", "display_node": "4"}));
        assert_eq!(event.executing_node().as_deref(), Some("4"));

        let event = ClientEvent::Executing(json!({"node": 9, "display_node": null}));
        assert_eq!(event.executing_node().as_deref(), Some("9"));

        let event = ClientEvent::Executing(json!({"node": null}));
        assert_eq!(event.executing_node(), None);
    }

    #[test]
    fn unknown_image_codes_default_to_jpeg() {
        assert_eq!(ImageFormat::from_code(Some(2)), ImageFormat::Png);
        assert_eq!(ImageFormat::from_code(Some(1)), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_code(Some(99)), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_code(None), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::Png.mime(), "image/png");
    }
}
