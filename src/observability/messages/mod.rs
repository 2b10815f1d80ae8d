// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for consistent human-readable output and
//! [`StructuredLog`] to emit the same event with machine-readable fields.
//!
//! # Organization
//!
//! * `transport` - connection state machine, frame decoding, polling fallback
//! * `queue` - single-flight submission loop and engine responses
//! * `compiler` - job flattening

use tracing::Span;

pub mod compiler;
pub mod queue;
pub mod transport;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its documented level with structured fields attached.
    fn log(&self);

    /// Open a span carrying the same fields as the message.
    fn span(&self, name: &str) -> Span;
}
