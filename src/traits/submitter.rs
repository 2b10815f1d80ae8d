// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use crate::client::types::{PromptResponse, QueuePromptRequest};
use crate::errors::{RequestError, SubmissionError};

/// Sends compiled jobs to the engine.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Submit one job.
    ///
    /// An accepted job may still carry per-node errors in its response; a
    /// rejected one comes back as [`SubmissionError::Rejected`].
    async fn submit(&self, request: QueuePromptRequest) -> Result<PromptResponse, SubmissionError>;
}

/// Engine status snapshot used by the polling fallback.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<Value, RequestError>;
}
