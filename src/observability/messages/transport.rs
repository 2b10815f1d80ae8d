// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the live channel and its polling fallback.
//!
//! This module contains message types for logging events related to:
//! * Live channel connect, close and reconnect scheduling
//! * Frame decoding failures and unknown message types
//! * Polling fallback start and stop
//! * Session identity handshakes

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Live channel opened.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use dagwood_client::observability::messages::transport::LiveChannelOpened;
///
/// let msg = LiveChannelOpened {
///     url: "ws://127.0.0.1:8188/ws",
///     is_reconnect: true,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct LiveChannelOpened<'a> {
    pub url: &'a str,
    pub is_reconnect: bool,
}

impl Display for LiveChannelOpened<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.is_reconnect {
            write!(f, "Live channel reconnected to {}", self.url)
        } else {
            write!(f, "Live channel opened to {}", self.url)
        }
    }
}

impl StructuredLog for LiveChannelOpened<'_> {
    fn log(&self) {
        tracing::info!(url = self.url, is_reconnect = self.is_reconnect, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "live_channel",
            span_name = name,
            url = self.url,
            is_reconnect = self.is_reconnect,
        )
    }
}

/// Live channel connection attempt failed.
///
/// # Log Level
/// `warn!` - Recovered locally by retrying (and polling on the first attempt)
///
/// # Example
/// ```
/// use dagwood_client::observability::messages::transport::LiveChannelConnectFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
/// let msg = LiveChannelConnectFailed {
///     url: "ws://127.0.0.1:8188/ws",
///     error: &error,
///     falls_back_to_polling: true,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct LiveChannelConnectFailed<'a> {
    pub url: &'a str,
    pub error: &'a dyn std::error::Error,
    pub falls_back_to_polling: bool,
}

impl Display for LiveChannelConnectFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Live channel connect to {} failed: {}", self.url, self.error)?;
        if self.falls_back_to_polling {
            write!(f, " (falling back to status polling)")?;
        }
        Ok(())
    }
}

impl StructuredLog for LiveChannelConnectFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            url = self.url,
            error = %self.error,
            falls_back_to_polling = self.falls_back_to_polling,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "live_channel_connect_failed",
            span_name = name,
            url = self.url,
            error = %self.error,
        )
    }
}

/// An established live channel was lost.
///
/// # Log Level
/// `warn!` - Observers see a null status until the channel is restored
pub struct LiveChannelLost<'a> {
    pub url: &'a str,
    pub reason: &'a str,
    pub retry_in: Duration,
}

impl Display for LiveChannelLost<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Live channel to {} lost ({}), reconnecting in {:?}",
            self.url, self.reason, self.retry_in
        )
    }
}

impl StructuredLog for LiveChannelLost<'_> {
    fn log(&self) {
        tracing::warn!(
            url = self.url,
            reason = self.reason,
            retry_in_ms = self.retry_in.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("live_channel_lost", span_name = name, url = self.url)
    }
}

/// A single inbound frame could not be decoded. The connection stays up.
///
/// # Log Level
/// `warn!` - Frame skipped
///
/// # Example
/// ```
/// use dagwood_client::errors::ProtocolError;
/// use dagwood_client::observability::messages::transport::FrameDecodeFailed;
///
/// let error = ProtocolError::UnknownBinaryEvent(7);
/// let msg = FrameDecodeFailed {
///     frame_kind: "binary",
///     frame_len: 12,
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct FrameDecodeFailed<'a> {
    pub frame_kind: &'a str,
    pub frame_len: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for FrameDecodeFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unhandled {} message ({} bytes): {}",
            self.frame_kind, self.frame_len, self.error
        )
    }
}

impl StructuredLog for FrameDecodeFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            frame_kind = self.frame_kind,
            frame_len = self.frame_len,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "frame_decode_failed",
            span_name = name,
            frame_kind = self.frame_kind,
        )
    }
}

/// Polling fallback started after the first live channel attempt failed.
///
/// # Log Level
/// `info!` - Degraded mode entered
pub struct PollingStarted {
    pub interval: Duration,
}

impl Display for PollingStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Polling engine status every {:?}", self.interval)
    }
}

impl StructuredLog for PollingStarted {
    fn log(&self) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("polling", span_name = name)
    }
}

/// Polling fallback stopped because the live channel opened.
///
/// # Log Level
/// `info!` - Degraded mode left
pub struct PollingStopped;

impl Display for PollingStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Status polling stopped, live channel is open")
    }
}

impl StructuredLog for PollingStopped {
    fn log(&self) {
        tracing::info!("{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("polling_stopped", span_name = name)
    }
}

/// A session identifier was handed out by the engine and adopted.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SessionAdopted<'a> {
    pub client_id: &'a str,
    pub previous: Option<&'a str>,
}

impl Display for SessionAdopted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.previous {
            Some(previous) => write!(
                f,
                "Adopted session id '{}' (replacing '{}')",
                self.client_id, previous
            ),
            None => write!(f, "Adopted session id '{}'", self.client_id),
        }
    }
}

impl StructuredLog for SessionAdopted<'_> {
    fn log(&self) {
        tracing::info!(
            client_id = self.client_id,
            previous = self.previous.unwrap_or(""),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("session", span_name = name, client_id = self.client_id)
    }
}

/// A text message with an unknown type arrived and nothing listens for it.
/// Reported once per distinct type name.
///
/// # Log Level
/// `warn!` - Probable version mismatch with the engine
pub struct UnknownMessageType<'a> {
    pub kind: &'a str,
}

impl Display for UnknownMessageType<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unknown message type {}", self.kind)
    }
}

impl StructuredLog for UnknownMessageType<'_> {
    fn log(&self) {
        tracing::warn!(kind = self.kind, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("unknown_message_type", span_name = name, kind = self.kind)
    }
}

/// The adopted session identity could not be written to its store. The
/// identity stays active for this process but will not survive a restart.
///
/// # Log Level
/// `warn!` - Degraded but recoverable
pub struct SessionPersistFailed<'a> {
    pub client_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for SessionPersistFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to persist session '{}': {}",
            self.client_id, self.error
        )
    }
}

impl StructuredLog for SessionPersistFailed<'_> {
    fn log(&self) {
        tracing::warn!(client_id = self.client_id, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("session_persist_failed", span_name = name, client_id = self.client_id)
    }
}
