// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Realtime link to the engine.
//!
//! [`Transport`] is the only owner of the live channel. Everything it reads
//! ends up on the [`EventBus`](crate::events::EventBus) in frame order:
//!
//! ```text
//!   Connector ──► LiveChannel ──► Frame ──► handle_frame ──► EventBus
//!                                   │
//!                     binary: preview image (b_preview)
//!                     text:   status / progress / executing / ... / custom
//! ```
//!
//! When the first connection attempt fails, status polling stands in until a
//! live channel opens.

mod channel;
mod connection;
mod frame;
mod poller;

#[cfg(test)]
mod integration_tests;

pub use channel::WebSocketConnector;
pub use connection::{ConnectionState, Transport, TransportSettings};
pub use frame::{decode_binary, parse_text, Frame, TextMessage, PREVIEW_IMAGE_EVENT};
