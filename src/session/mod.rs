// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Session correlation identity.
//!
//! The engine tags every live message and every job with a client id. A client
//! either resumes a previously adopted id (passed back on reconnect) or
//! receives a fresh one from the engine's first `status` message. A duplicated
//! client must never resume the original's id, but it does learn which id the
//! original used so it can pick up the same workflow.

mod store;

use std::sync::Arc;

use tokio::sync::watch;

pub use store::{FileIdentityStore, IdentityScope, IdentityStore, MemoryIdentityStore};

use crate::observability::messages::transport::{SessionAdopted, SessionPersistFailed};
use crate::observability::messages::StructuredLog;

/// Shared handle to the active session id.
///
/// Clones share state: the transport adopts ids, the queue driver reads them.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use dagwood_client::session::{MemoryIdentityStore, SessionIdentity};
///
/// let identity = SessionIdentity::new(Arc::new(MemoryIdentityStore::new()));
/// assert_eq!(identity.reconnect_id(), None);
///
/// identity.adopt("5f2e");
/// assert_eq!(identity.client_id(), "5f2e");
/// assert_eq!(identity.reconnect_id().as_deref(), Some("5f2e"));
///
/// // A duplicate starts without a session but knows where it came from
/// let copy = identity.duplicate();
/// assert_eq!(copy.reconnect_id(), None);
/// assert_eq!(copy.initial_client_id(), Some("5f2e"));
/// ```
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn IdentityStore>,
    /// Id confirmed by the engine in this process
    current: watch::Sender<Option<String>>,
    initial_client_id: Option<String>,
}

impl SessionIdentity {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        let initial_client_id = store.load(IdentityScope::Inherited);
        Self {
            inner: Arc::new(Inner {
                store,
                current: watch::Sender::new(None),
                initial_client_id,
            }),
        }
    }

    /// Session to resume when (re)connecting the live channel.
    pub fn reconnect_id(&self) -> Option<String> {
        self.inner.store.load(IdentityScope::Context)
    }

    /// Id confirmed by the engine in this process, if any.
    ///
    /// A persisted id does not count until the engine's `status` handshake
    /// hands it back.
    pub fn current(&self) -> Option<String> {
        self.inner.current.borrow().clone()
    }

    /// Id sent with submissions: the confirmed id, else the persisted one,
    /// else empty.
    pub fn client_id(&self) -> String {
        self.current()
            .or_else(|| self.reconnect_id())
            .unwrap_or_default()
    }

    /// Wait until the engine has confirmed a session id and return it.
    pub async fn wait_adopted(&self) -> String {
        let mut rx = self.inner.current.subscribe();
        let id = match rx.wait_for(Option::is_some).await {
            Ok(id) => (*id).clone().unwrap_or_default(),
            // The sender lives as long as self
            Err(_) => String::new(),
        };
        id
    }

    /// Id this client inherited at construction time, used to locate the
    /// workflow of the client it was duplicated from.
    pub fn initial_client_id(&self) -> Option<&str> {
        self.inner.initial_client_id.as_deref()
    }

    /// Make `id` the active session and persist it in both scopes.
    ///
    /// A store failure is logged; the id remains active in memory.
    pub fn adopt(&self, id: &str) {
        let previous = self.inner.current.send_replace(Some(id.to_string()));
        if previous.as_deref() != Some(id) {
            SessionAdopted {
                client_id: id,
                previous: previous.as_deref(),
            }
            .log();
        }

        for scope in [IdentityScope::Context, IdentityScope::Inherited] {
            if let Err(error) = self.inner.store.save(scope, id) {
                SessionPersistFailed { client_id: id, error: &error }.log();
            }
        }
    }

    /// Identity for a duplicated client: an in-memory store seeded with
    /// the inherited scope only, and no active session.
    pub fn duplicate(&self) -> SessionIdentity {
        let mut store = MemoryIdentityStore::new();
        if let Some(inherited) = self.inner.store.load(IdentityScope::Inherited) {
            store = store.with_value(IdentityScope::Inherited, inherited);
        }
        SessionIdentity::new(Arc::new(store))
    }
}
