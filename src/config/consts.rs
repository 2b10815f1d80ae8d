// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Pause between a lost (or refused) live channel and the next attempt
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 300;
/// Status polling period while the live channel has never opened
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
/// Timeout applied to every engine HTTP request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Jobs per auto-queue trigger
pub const DEFAULT_BATCH_COUNT: u32 = 1;
/// How long the CLI waits for the session handshake before submitting anyway
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
