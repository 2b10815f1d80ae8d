// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::RequestClient;
use crate::errors::{RequestError, TransportError};
use crate::events::{names, ClientEvent, EventBus, ImageFormat};
use crate::session::{IdentityScope, IdentityStore, MemoryIdentityStore, SessionIdentity};
use crate::traits::{Connector, LiveChannel, StatusSource};
use crate::transport::{ConnectionState, Frame, Transport, TransportSettings};

/// What one connection attempt does.
enum Attempt {
    Refuse,
    /// Deliver the frames, then close
    Serve(Vec<Frame>),
    /// Deliver the frames, then stay open
    ServeAndHold(Vec<Frame>),
}

/// Plays back a script of connection attempts. Once the script runs out,
/// every further attempt is refused.
#[derive(Default)]
struct ScriptedConnector {
    script: Mutex<VecDeque<Attempt>>,
    attempts: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    fn new(script: Vec<Attempt>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }
}

struct ScriptedChannel {
    frames: VecDeque<Frame>,
    hold_open: bool,
}

#[async_trait]
impl LiveChannel for ScriptedChannel {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        match self.frames.pop_front() {
            Some(frame) => Some(Ok(frame)),
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn LiveChannel>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Attempt::Refuse);
        match next {
            Attempt::Refuse => Err(TransportError::Connect {
                url: url.to_string(),
                reason: "connection refused".into(),
            }),
            Attempt::Serve(frames) => Ok(Box::new(ScriptedChannel {
                frames: frames.into(),
                hold_open: false,
            })),
            Attempt::ServeAndHold(frames) => Ok(Box::new(ScriptedChannel {
                frames: frames.into(),
                hold_open: true,
            })),
        }
    }
}

struct FixedStatus(Result<Value, ()>);

#[async_trait]
impl StatusSource for FixedStatus {
    async fn fetch_status(&self) -> Result<Value, RequestError> {
        self.0.clone().map_err(|()| RequestError::Status {
            status: 503,
            body: String::new(),
        })
    }
}

fn text(kind: &str, data: Value) -> Frame {
    Frame::Text(json!({"type": kind, "data": data}).to_string())
}

fn record(bus: &EventBus, names: &[&str]) -> Arc<Mutex<Vec<ClientEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for name in names {
        let sink = Arc::clone(&seen);
        bus.on(*name, move |event| sink.lock().unwrap().push(event.clone()));
    }
    seen
}

fn transport(
    connector: Arc<ScriptedConnector>,
    status: Result<Value, ()>,
    bus: &EventBus,
    identity: &SessionIdentity,
) -> Arc<Transport> {
    let requests = RequestClient::new("http://127.0.0.1:8188", "", Duration::from_secs(1)).unwrap();
    Arc::new(Transport::new(
        requests,
        connector,
        Arc::new(FixedStatus(status)),
        bus.clone(),
        identity.clone(),
        TransportSettings {
            reconnect_delay: Duration::from_millis(300),
            poll_interval: Duration::from_millis(1000),
        },
    ))
}

fn spawn(transport: &Arc<Transport>) -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let shutdown = CancellationToken::new();
    let runner = Arc::clone(transport);
    let token = shutdown.clone();
    (shutdown, tokio::spawn(async move { runner.run(token).await }))
}

fn fresh_identity() -> SessionIdentity {
    SessionIdentity::new(Arc::new(MemoryIdentityStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_attempt_failure_polls_every_second() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::STATUS, names::RECONNECTING]);
        let connector = ScriptedConnector::new(vec![]);
        let transport = transport(connector.clone(), Ok(json!({"exec_info": {"queue_remaining": 2}})), &bus, &fresh_identity());

        let (shutdown, task) = spawn(&transport);
        tokio::time::sleep(Duration::from_millis(3500)).await;
        shutdown.cancel();
        task.await.unwrap();

        let events = seen.lock().unwrap().clone();
        assert_eq!(events.len(), 3);
        for event in events {
            assert_eq!(event, ClientEvent::Status(Some(json!({"exec_info": {"queue_remaining": 2}}))));
        }
        // The live channel keeps retrying underneath the polling
        assert!(connector.attempts.load(Ordering::SeqCst) > 5);
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_polls_emit_null_status() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::STATUS]);
        let transport = transport(ScriptedConnector::new(vec![]), Err(()), &bus, &fresh_identity());

        let (shutdown, task) = spawn(&transport);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![ClientEvent::Status(None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_stops_once_the_live_channel_opens() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::STATUS, names::RECONNECTED]);
        let mut script: Vec<Attempt> = (0..7).map(|_| Attempt::Refuse).collect();
        script.push(Attempt::ServeAndHold(vec![]));
        let transport = transport(ScriptedConnector::new(script), Ok(json!({"exec_info": {}})), &bus, &fresh_identity());

        let (shutdown, task) = spawn(&transport);
        // Eight attempts 300ms apart: open at 2100ms, after two polls
        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(transport.state(), ConnectionState::Open);
        shutdown.cancel();
        task.await.unwrap();

        let events = seen.lock().unwrap().clone();
        let polls = events.iter().filter(|e| matches!(e, ClientEvent::Status(_))).count();
        assert_eq!(polls, 2);
        assert_eq!(events.last(), Some(&ClientEvent::Reconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn lost_channel_reconnects_and_notifies() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::STATUS, names::RECONNECTING, names::RECONNECTED]);
        let identity = fresh_identity();
        let connector = ScriptedConnector::new(vec![
            Attempt::Serve(vec![text(
                names::STATUS,
                json!({"status": {"exec_info": {"queue_remaining": 0}}, "sid": "abc123"}),
            )]),
            Attempt::ServeAndHold(vec![]),
        ]);
        let transport = transport(connector.clone(), Err(()), &bus, &identity);

        let (shutdown, task) = spawn(&transport);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ClientEvent::Status(Some(json!({"exec_info": {"queue_remaining": 0}}))),
                ClientEvent::Status(None),
                ClientEvent::Reconnecting,
                ClientEvent::Reconnected,
            ]
        );
        assert_eq!(identity.client_id(), "abc123");

        // The reconnect resumes the adopted session
        let urls = connector.urls.lock().unwrap().clone();
        assert_eq!(urls[0], "ws://127.0.0.1:8188/ws");
        assert_eq!(urls[1], "ws://127.0.0.1:8188/ws?clientId=abc123");
    }

    #[tokio::test(start_paused = true)]
    async fn failures_after_an_open_never_start_polling() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::STATUS]);
        let transport = transport(ScriptedConnector::new(vec![Attempt::Serve(vec![])]), Ok(json!({})), &bus, &fresh_identity());

        let (shutdown, task) = spawn(&transport);
        tokio::time::sleep(Duration::from_millis(5000)).await;
        shutdown.cancel();
        task.await.unwrap();

        // Only the disconnect notification, no polled statuses
        assert_eq!(*seen.lock().unwrap(), vec![ClientEvent::Status(None)]);
    }

    #[tokio::test]
    async fn png_preview_frames_are_published() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::PREVIEW]);
        let transport = transport(ScriptedConnector::new(vec![]), Err(()), &bus, &fresh_identity());

        let mut frame = vec![0, 0, 0, 1, 0, 0, 0, 2];
        frame.extend_from_slice(&[0x89, b'P', b'N', b'G']);
        transport.handle_frame(Frame::Binary(frame)).unwrap();

        let events = seen.lock().unwrap().clone();
        let [ClientEvent::Preview(preview)] = events.as_slice() else {
            panic!("expected one preview, got {:?}", events);
        };
        assert_eq!(preview.format, ImageFormat::Png);
        assert_eq!(preview.bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn unknown_types_are_dropped_unless_listened_for() {
        let bus = EventBus::new();
        let transport = transport(ScriptedConnector::new(vec![]), Err(()), &bus, &fresh_identity());

        // No listener: swallowed, and reported only once
        transport.handle_frame(text("crystools.monitor", json!({"cpu": 3}))).unwrap();
        transport.handle_frame(text("crystools.monitor", json!({"cpu": 4}))).unwrap();
        assert_eq!(transport.reported_unknown_count(), 1);

        let seen = record(&bus, &["crystools.monitor"]);
        transport.handle_frame(text("crystools.monitor", json!({"cpu": 5}))).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ClientEvent::Custom {
                name: "crystools.monitor".into(),
                data: json!({"cpu": 5}),
            }]
        );
    }

    #[tokio::test]
    async fn fixed_types_are_republished_verbatim() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::EXECUTING, names::EXECUTION_ERROR]);
        let transport = transport(ScriptedConnector::new(vec![]), Err(()), &bus, &fresh_identity());

        transport.handle_frame(text(names::EXECUTING, json!({"node": "4", "prompt_id": "p"}))).unwrap();
        transport.handle_frame(text(names::EXECUTION_ERROR, json!({"node_id": "4"}))).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ClientEvent::Executing(json!({"node": "4", "prompt_id": "p"})),
                ClientEvent::ExecutionError(json!({"node_id": "4"})),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn bad_frames_do_not_close_the_channel() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::PROGRESS, names::RECONNECTING]);
        let connector = ScriptedConnector::new(vec![Attempt::ServeAndHold(vec![
            Frame::Binary(vec![0, 0, 0, 9]),
            Frame::Text("{not json".into()),
            text(names::PROGRESS, json!({"value": 1, "max": 2})),
        ])]);
        let transport = transport(connector.clone(), Err(()), &bus, &fresh_identity());

        let (shutdown, task) = spawn(&transport);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(transport.state(), ConnectionState::Open);
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![ClientEvent::Progress(json!({"value": 1, "max": 2}))]);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handshake_persists_into_both_scopes() {
        let bus = EventBus::new();
        let store = Arc::new(MemoryIdentityStore::new());
        let identity = SessionIdentity::new(store.clone());
        let transport = transport(ScriptedConnector::new(vec![]), Err(()), &bus, &identity);

        transport.handle_frame(text(names::STATUS, json!({"status": null, "sid": "s-1"}))).unwrap();

        assert_eq!(store.load(IdentityScope::Context).as_deref(), Some("s-1"));
        assert_eq!(store.load(IdentityScope::Inherited).as_deref(), Some("s-1"));
    }

    #[tokio::test]
    async fn client_local_names_from_the_engine_are_not_republished() {
        let bus = EventBus::new();
        let seen = record(&bus, &[names::GRAPH_CHANGED, names::PROMPT_QUEUED]);
        let transport = transport(ScriptedConnector::new(vec![]), Err(()), &bus, &fresh_identity());

        transport.handle_frame(text(names::GRAPH_CHANGED, json!({}))).unwrap();
        transport.handle_frame(text(names::PROMPT_QUEUED, json!({"number": 1}))).unwrap();

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(transport.reported_unknown_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn session_wait_resolves_after_the_status_handshake() {
        let bus = EventBus::new();
        let connector = ScriptedConnector::new(vec![Attempt::ServeAndHold(vec![text(
            names::STATUS,
            json!({"status": {}, "sid": "s-9"}),
        )])]);
        let transport = transport(connector, Err(()), &bus, &fresh_identity());

        let (shutdown, task) = spawn(&transport);
        let sid = transport.wait_for_session(Duration::from_secs(10)).await;
        assert_eq!(sid.as_deref(), Some("s-9"));
        assert_eq!(transport.identity().client_id(), "s-9");

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn session_wait_gives_up_without_a_handshake() {
        let bus = EventBus::new();
        let connector = ScriptedConnector::new(vec![Attempt::ServeAndHold(vec![])]);
        let transport = transport(connector, Err(()), &bus, &fresh_identity());

        let (shutdown, task) = spawn(&transport);
        assert_eq!(transport.wait_for_session(Duration::from_secs(10)).await, None);
        assert_eq!(transport.state(), ConnectionState::Open);

        shutdown.cancel();
        task.await.unwrap();
    }
}
