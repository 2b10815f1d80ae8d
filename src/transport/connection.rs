// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::RequestClient;
use crate::config::consts::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_RECONNECT_DELAY_MS};
use crate::errors::{ProtocolError, TransportError};
use crate::events::{names, ClientEvent, EventBus};
use crate::observability::messages::transport::{
    FrameDecodeFailed, LiveChannelConnectFailed, LiveChannelLost, LiveChannelOpened, UnknownMessageType,
};
use crate::observability::messages::StructuredLog;
use crate::session::SessionIdentity;
use crate::traits::{Connector, LiveChannel, StatusSource};
use crate::transport::frame::{decode_binary, parse_text, Frame};
use crate::transport::poller::poll_status;

/// Lifecycle of the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// An established channel was lost; waiting to retry.
    Reconnecting,
}

/// Timing knobs of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Constant pause between a close (or failed attempt) and the next attempt
    pub reconnect_delay: Duration,
    /// Status polling period while falling back
    pub poll_interval: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Owns the live channel: connects, demultiplexes frames onto the
/// [`EventBus`], reconnects forever with a constant delay, and polls engine
/// status when the very first connection attempt fails.
///
/// Polling stops as soon as a live channel opens and is never restarted
/// afterwards; a later outage is reported as a null status plus a
/// `reconnecting` event instead.
pub struct Transport {
    requests: RequestClient,
    connector: Arc<dyn Connector>,
    status_source: Arc<dyn StatusSource>,
    bus: EventBus,
    identity: SessionIdentity,
    settings: TransportSettings,
    state: watch::Sender<ConnectionState>,
    reported_unknown: Mutex<HashSet<String>>,
}

struct Poller {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl Poller {
    async fn shutdown(self) {
        self.stop.cancel();
        let _ = self.task.await;
    }
}

impl Transport {
    pub fn new(
        requests: RequestClient,
        connector: Arc<dyn Connector>,
        status_source: Arc<dyn StatusSource>,
        bus: EventBus,
        identity: SessionIdentity,
        settings: TransportSettings,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            requests,
            connector,
            status_source,
            bus,
            identity,
            settings,
            state,
            reported_unknown: Mutex::new(HashSet::new()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Wait up to `limit` for an open channel whose session the engine has
    /// confirmed. Returns the confirmed id, or `None` on timeout.
    pub async fn wait_for_session(&self, limit: Duration) -> Option<String> {
        let mut state = self.subscribe_state();
        let handshake = async {
            let _ = state.wait_for(|s| *s == ConnectionState::Open).await;
            self.identity.wait_adopted().await
        };
        tokio::time::timeout(limit, handshake).await.ok()
    }

    /// Drive the connection until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut is_reconnect = false;
        let mut ever_opened = false;
        let mut poller: Option<Poller> = None;

        loop {
            let url = match self.requests.live_url(self.identity.reconnect_id().as_deref()) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!(error = %e, "Cannot build live channel url, transport stopping");
                    break;
                }
            };
            let url_text = url.to_string();

            self.set_state(ConnectionState::Connecting);
            let attempt = tokio::select! {
                _ = shutdown.cancelled() => break,
                attempt = self.connector.connect(&url) => attempt,
            };

            match attempt {
                Err(error) => {
                    let falls_back = !is_reconnect && !ever_opened && poller.is_none();
                    LiveChannelConnectFailed {
                        url: &url_text,
                        error: &error,
                        falls_back_to_polling: falls_back,
                    }
                    .log();
                    if falls_back {
                        poller = Some(self.start_polling());
                    }
                    self.set_state(if ever_opened {
                        ConnectionState::Reconnecting
                    } else {
                        ConnectionState::Disconnected
                    });
                }
                Ok(mut channel) => {
                    ever_opened = true;
                    if let Some(poller) = poller.take() {
                        poller.shutdown().await;
                    }
                    self.set_state(ConnectionState::Open);
                    LiveChannelOpened {
                        url: &url_text,
                        is_reconnect,
                    }
                    .log();
                    if is_reconnect {
                        self.bus.emit(&ClientEvent::Reconnected);
                    }

                    let reason = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        reason = self.read_until_closed(channel.as_mut()) => reason,
                    };

                    self.set_state(ConnectionState::Reconnecting);
                    LiveChannelLost {
                        url: &url_text,
                        reason: &reason,
                        retry_in: self.settings.reconnect_delay,
                    }
                    .log();
                    self.bus.emit(&ClientEvent::Status(None));
                    self.bus.emit(&ClientEvent::Reconnecting);
                }
            }

            is_reconnect = true;
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.reconnect_delay) => {}
            }
        }

        if let Some(poller) = poller.take() {
            poller.shutdown().await;
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Decode one frame and publish what it carries.
    ///
    /// A frame that cannot be decoded is returned as an error; the caller
    /// logs it and keeps the channel open.
    pub fn handle_frame(&self, frame: Frame) -> Result<(), ProtocolError> {
        match frame {
            Frame::Binary(bytes) => {
                let preview = decode_binary(&bytes)?;
                self.bus.emit(&ClientEvent::Preview(preview));
            }
            Frame::Text(text) => {
                let message = parse_text(&text)?;
                self.dispatch_text(message.kind, message.data);
            }
        }
        Ok(())
    }

    async fn read_until_closed(&self, channel: &mut dyn LiveChannel) -> String {
        loop {
            match channel.next_frame().await {
                None => return "closed by peer".to_string(),
                Some(Err(TransportError::Read(reason))) => return reason,
                Some(Err(other)) => return other.to_string(),
                Some(Ok(frame)) => {
                    let (kind, len) = (frame.kind(), frame.len());
                    if let Err(error) = self.handle_frame(frame) {
                        FrameDecodeFailed {
                            frame_kind: kind,
                            frame_len: len,
                            error: &error,
                        }
                        .log();
                    }
                }
            }
        }
    }

    fn dispatch_text(&self, kind: String, data: Value) {
        if kind == names::STATUS {
            if let Some(sid) = data.get("sid").and_then(Value::as_str).filter(|s| !s.is_empty()) {
                self.identity.adopt(sid);
            }
            let status = data.get("status").cloned().unwrap_or(Value::Null);
            self.bus.emit(&ClientEvent::Status(Some(status).filter(|s| !s.is_null())));
            return;
        }

        if let Some(event) = ClientEvent::from_server(&kind, data.clone()) {
            self.bus.emit(&event);
        } else if !names::is_client_local(&kind) && self.bus.has_listener(&kind) {
            self.bus.emit(&ClientEvent::Custom { name: kind, data });
        } else {
            let first_report = self
                .reported_unknown
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(kind.clone());
            if first_report {
                UnknownMessageType { kind: &kind }.log();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn reported_unknown_count(&self) -> usize {
        self.reported_unknown.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn start_polling(&self) -> Poller {
        let stop = CancellationToken::new();
        let task = tokio::spawn(poll_status(
            Arc::clone(&self.status_source),
            self.bus.clone(),
            self.settings.poll_interval,
            stop.clone(),
        ));
        Poller { stop, task }
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            let changed = *current != next;
            *current = next;
            changed
        });
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("api_root", &self.requests.api_root().as_str())
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish()
    }
}
