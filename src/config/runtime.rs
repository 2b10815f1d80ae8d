// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::client::{EngineApi, RequestClient};
use crate::compiler::GraphCompiler;
use crate::config::ClientConfig;
use crate::engine::{share, AutoQueue, ExecutionTracker, JobLedger, QueueDriver};
use crate::errors::ConfigError;
use crate::events::EventBus;
use crate::graph::Graph;
use crate::session::{FileIdentityStore, IdentityStore, MemoryIdentityStore, SessionIdentity};
use crate::transport::{Transport, TransportSettings, WebSocketConnector};

/// Everything a running client is made of, wired together.
///
/// Nothing runs until the caller drives [`Transport::run`] on a task of its
/// own. The auto queue, when enabled, is already watching the bus.
#[derive(Debug)]
pub struct ClientRuntime {
    pub bus: EventBus,
    pub identity: SessionIdentity,
    pub api: Arc<EngineApi>,
    pub transport: Arc<Transport>,
    pub driver: QueueDriver,
    pub tracker: ExecutionTracker,
    pub auto_queue: Option<AutoQueue>,
}

/// Client runtime builder - assembles every component from configuration.
///
/// # Examples
///
/// ```
/// use dagwood_client::config::{ClientConfig, RuntimeBuilder};
/// use dagwood_client::graph::Graph;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let config = ClientConfig::new("http://127.0.0.1:8188");
/// let runtime = RuntimeBuilder::from_config(&config, Graph::new()).unwrap();
///
/// assert!(runtime.auto_queue.is_none());
/// assert_eq!(runtime.identity.reconnect_id(), None);
/// # });
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build the client runtime around `graph`.
    ///
    /// Must be called inside a tokio runtime when auto queue is enabled.
    pub fn from_config(cfg: &ClientConfig, graph: Graph) -> Result<ClientRuntime, ConfigError> {
        cfg.validate().map_err(ConfigError::Invalid)?;

        let bus = EventBus::new();
        let store: Arc<dyn IdentityStore> = match &cfg.session_file {
            Some(path) => Arc::new(FileIdentityStore::new(path)),
            None => Arc::new(MemoryIdentityStore::new()),
        };
        let identity = SessionIdentity::new(store);

        let requests = RequestClient::new(&cfg.api_root, &cfg.user, cfg.request_timeout())
            .map_err(|e| ConfigError::Invalid(vec![e.to_string()]))?;
        let api = Arc::new(EngineApi::new(requests.clone()));

        let transport = Arc::new(Transport::new(
            requests,
            Arc::new(WebSocketConnector),
            api.clone(),
            bus.clone(),
            identity.clone(),
            TransportSettings {
                reconnect_delay: cfg.reconnect_delay(),
                poll_interval: cfg.poll_interval(),
            },
        ));

        let ledger = JobLedger::new();
        let tracker = ExecutionTracker::attach(&bus, ledger.clone());
        let driver = QueueDriver::new(
            share(graph),
            api.clone(),
            identity.clone(),
            bus.clone(),
            ledger,
            GraphCompiler::new().with_dev_mode(cfg.dev_mode),
        );
        let auto_queue = AutoQueue::start(cfg.auto_queue, &bus, driver.clone(), tracker.clone());

        Ok(ClientRuntime {
            bus,
            identity,
            api,
            transport,
            driver,
            tracker,
            auto_queue,
        })
    }
}
