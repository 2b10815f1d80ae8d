// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from the request layer. No retries happen at this layer.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A route could not be joined onto the configured API root
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client failed before a response was received
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body was not the expected JSON shape
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The engine answered with a non-success status
    #[error("engine responded with {status}: {body}")]
    Status { status: u16, body: String },
}
