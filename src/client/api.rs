// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::client::request::{ApiRequest, RequestClient};
use crate::client::types::{EngineList, PromptErrorResponse, PromptResponse, QueuePromptRequest, QueueSnapshot};
use crate::errors::{RequestError, SubmissionError};
use crate::traits::{JobSubmitter, StatusSource};

/// Default number of history entries requested.
pub const DEFAULT_HISTORY_ITEMS: usize = 200;

/// Typed access to the engine's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct EngineApi {
    requests: RequestClient,
}

impl EngineApi {
    pub fn new(requests: RequestClient) -> Self {
        Self { requests }
    }

    pub fn requests(&self) -> &RequestClient {
        &self.requests
    }

    /// `POST /prompt`. A non-200 answer becomes [`SubmissionError::Rejected`]
    /// carrying the engine's error body.
    pub async fn queue_prompt(&self, request: &QueuePromptRequest) -> Result<PromptResponse, SubmissionError> {
        let body = serde_json::to_value(request).map_err(RequestError::from)?;
        let response = self.requests.fetch("/prompt", ApiRequest::post(body)).await?;
        let status = response.status();
        let text = response.text().await.map_err(RequestError::from)?;

        if status != StatusCode::OK {
            return match serde_json::from_str::<PromptErrorResponse>(&text) {
                Ok(response) => Err(SubmissionError::Rejected {
                    status: status.as_u16(),
                    response,
                }),
                Err(_) => Err(RequestError::Status {
                    status: status.as_u16(),
                    body: text,
                }
                .into()),
            };
        }
        Ok(serde_json::from_str(&text).map_err(RequestError::from)?)
    }

    /// `GET /prompt`: queue status in the same shape as a live `status` message.
    pub async fn fetch_status(&self) -> Result<Value, RequestError> {
        self.get_json("/prompt").await
    }

    /// `GET /queue`
    pub async fn queue(&self) -> Result<QueueSnapshot, RequestError> {
        self.get_json("/queue").await
    }

    /// `GET /history`, newest entries up to `max_items`, keyed by prompt id.
    pub async fn history(&self, max_items: usize) -> Result<BTreeMap<String, Value>, RequestError> {
        self.get_json(&format!("/history?max_items={}", max_items)).await
    }

    pub async fn system_stats(&self) -> Result<Value, RequestError> {
        self.get_json("/system_stats").await
    }

    /// Frontend extension script URLs.
    pub async fn extensions(&self) -> Result<Vec<String>, RequestError> {
        self.get_json("/extensions").await
    }

    pub async fn embeddings(&self) -> Result<Vec<String>, RequestError> {
        self.get_json("/embeddings").await
    }

    /// Node definitions keyed by node type.
    pub async fn object_info(&self) -> Result<BTreeMap<String, Value>, RequestError> {
        self.get_json("/object_info").await
    }

    /// Ask the engine to stop the running job. The local queue is unaffected.
    pub async fn interrupt(&self) -> Result<(), RequestError> {
        self.post_item("/interrupt", ApiRequest::post_empty()).await
    }

    pub async fn delete_item(&self, list: EngineList, id: &str) -> Result<(), RequestError> {
        self.post_item(list.route(), ApiRequest::post(json!({ "delete": [id] })))
            .await
    }

    pub async fn clear_items(&self, list: EngineList) -> Result<(), RequestError> {
        self.post_item(list.route(), ApiRequest::post(json!({ "clear": true })))
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, RequestError> {
        let response = self.requests.fetch(route, ApiRequest::get()).await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(RequestError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_item(&self, route: &str, request: ApiRequest) -> Result<(), RequestError> {
        let response = self.requests.fetch(route, request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl JobSubmitter for EngineApi {
    async fn submit(&self, request: QueuePromptRequest) -> Result<PromptResponse, SubmissionError> {
        self.queue_prompt(&request).await
    }
}

#[async_trait]
impl StatusSource for EngineApi {
    async fn fetch_status(&self) -> Result<Value, RequestError> {
        EngineApi::fetch_status(self).await
    }
}
