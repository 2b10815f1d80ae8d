// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Async seams between the client's moving parts and the network.
//!
//! Production code wires these to [`EngineApi`](crate::client::EngineApi) and
//! [`WebSocketConnector`](crate::transport::WebSocketConnector); tests swap in
//! scripted implementations.

pub mod channel;
pub mod submitter;

pub use channel::{Connector, LiveChannel};
pub use submitter::{JobSubmitter, StatusSource};
