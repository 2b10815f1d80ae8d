// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire types exchanged with the engine's HTTP endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compiler::JobDescription;

/// Where a submitted job lands in the engine's queue.
///
/// Derived from a queue request's priority: negative values go to the head of
/// the queue, zero appends, anything else names an explicit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePlacement {
    Front,
    Back,
    Position(i64),
}

impl QueuePlacement {
    pub fn from_priority(priority: i64) -> Self {
        match priority {
            p if p < 0 => QueuePlacement::Front,
            0 => QueuePlacement::Back,
            p => QueuePlacement::Position(p),
        }
    }
}

/// `extra_data` block of a submission. Carries the serialized graph so the
/// engine can embed it into its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraData {
    pub extra_pnginfo: ExtraPngInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraPngInfo {
    pub workflow: Value,
}

/// Body of `POST /prompt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuePromptRequest {
    pub client_id: String,
    pub prompt: JobDescription,
    pub extra_data: ExtraData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
}

impl QueuePromptRequest {
    pub fn new(
        client_id: impl Into<String>,
        placement: QueuePlacement,
        prompt: JobDescription,
        workflow: Value,
    ) -> Self {
        let (front, number) = match placement {
            QueuePlacement::Front => (Some(true), None),
            QueuePlacement::Back => (None, None),
            QueuePlacement::Position(n) => (None, Some(n)),
        };
        Self {
            client_id: client_id.into(),
            prompt,
            extra_data: ExtraData {
                extra_pnginfo: ExtraPngInfo { workflow },
            },
            front,
            number,
        }
    }
}

/// One reason a node failed engine-side validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReason {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub extra_info: Value,
}

/// Per-node validation failure reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeErrorDetail {
    #[serde(default)]
    pub errors: Vec<ErrorReason>,
    #[serde(default)]
    pub dependent_outputs: Vec<Value>,
    #[serde(default)]
    pub class_type: String,
}

/// Node id -> validation failure.
pub type NodeErrors = BTreeMap<String, NodeErrorDetail>;

/// Successful `POST /prompt` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptResponse {
    pub prompt_id: String,
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub node_errors: NodeErrors,
}

/// Error body of a rejected `POST /prompt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptErrorResponse {
    #[serde(default)]
    pub error: Option<ErrorReason>,
    #[serde(default)]
    pub node_errors: NodeErrors,
}

/// Running and pending jobs as reported by `GET /queue`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(rename = "queue_running", default)]
    pub running: Vec<Value>,
    #[serde(rename = "queue_pending", default)]
    pub pending: Vec<Value>,
}

/// Engine-side lists that support deleting items and clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineList {
    Queue,
    History,
}

impl EngineList {
    pub fn route(&self) -> &'static str {
        match self {
            EngineList::Queue => "/queue",
            EngineList::History => "/history",
        }
    }
}
