// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::events::ClientEvent;

/// Callback registered for one event name.
pub type Handler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Named publish/subscribe hub.
///
/// Handlers for the same name run in registration order, synchronously, on the
/// task that calls [`EventBus::emit`]. Nothing is promised about ordering
/// across different names. The bus also answers whether a name has any
/// handler, which the transport uses to tell "known but unlistened" message
/// types apart from truly unknown ones.
///
/// Cloning is cheap; clones share the same handler table.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use dagwood_client::events::{ClientEvent, EventBus, names};
///
/// let bus = EventBus::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// bus.on(names::RECONNECTED, move |event| sink.lock().unwrap().push(event.clone()));
///
/// assert!(bus.has_listener(names::RECONNECTED));
/// assert_eq!(bus.emit(&ClientEvent::Reconnected), 1);
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<String, Vec<Handler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events named `name`.
    pub fn on<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.entry(name.into()).or_default().push(Arc::new(handler));
    }

    /// Whether at least one handler is registered for `name`.
    pub fn has_listener(&self, name: &str) -> bool {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.get(name).is_some_and(|list| !list.is_empty())
    }

    /// Deliver `event` to every handler registered under its name.
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &ClientEvent) -> usize {
        // Snapshot so handlers may register or emit without deadlocking
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            match handlers.get(event.name()) {
                Some(list) => list.clone(),
                None => return 0,
            }
        };
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("EventBus")
            .field("event_names", &handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
