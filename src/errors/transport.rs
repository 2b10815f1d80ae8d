// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Live channel faults. These are recovered inside the transport by
/// reconnecting and are never returned to callers of the client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The live channel could not be opened
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// Reading from an open live channel failed
    #[error("live channel read failed: {0}")]
    Read(String),
}

/// Violations of the live channel wire format.
///
/// These point at a version mismatch between client and engine, so they are
/// always reported even though the offending frame is skipped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A binary frame too short to carry its event type code
    #[error("binary frame of {len} bytes is too short to carry an event type")]
    TruncatedFrame { len: usize },

    /// A binary frame with an event type code this client does not know
    #[error("Unknown binary websocket message of type {0}")]
    UnknownBinaryEvent(u32),

    /// A text frame that is not a `{type, data}` JSON object
    #[error("malformed text message: {0}")]
    MalformedText(#[from] serde_json::Error),
}
