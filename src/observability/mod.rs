// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout the client. Message types follow a struct-based pattern
//! with a `Display` implementation so that:
//!
//! * Log text lives in one place instead of being scattered as string literals
//! * Structured fields and human-readable text never drift apart
//! * Every event can also open a matching `tracing` span
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::transport` - live channel lifecycle, decoding and polling fallback
//! * `messages::queue` - submission queue processing and engine responses
//! * `messages::compiler` - graph flattening and link resolution
//!
//! # Usage
//!
//! ```rust
//! use dagwood_client::observability::messages::transport::LiveChannelOpened;
//! use dagwood_client::observability::messages::StructuredLog;
//!
//! let msg = LiveChannelOpened {
//!     url: "ws://127.0.0.1:8188/ws",
//!     is_reconnect: false,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
