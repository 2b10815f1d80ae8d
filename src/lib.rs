// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod client;     // engine HTTP endpoints
pub mod compiler;   // graph -> job flattening
pub mod config;     // config + runtime wiring
pub mod engine;     // submission queue + execution tracking
pub mod errors;     // error handling
pub mod events;     // event bus
pub mod graph;      // editor graph model
pub mod observability;
pub mod session;    // session identity
pub mod traits;     // async seams
pub mod transport;  // live channel
