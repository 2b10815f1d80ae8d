// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::{ClientEvent, EventBus};
use crate::observability::messages::transport::{PollingStarted, PollingStopped};
use crate::observability::messages::StructuredLog;
use crate::traits::StatusSource;

/// Status polling used while the live channel has never opened.
///
/// Every `interval` (first tick one interval after start) it fetches the
/// engine status and emits it as a `status` event, or a null status when
/// the request fails. Runs until `stop` is cancelled.
pub(crate) async fn poll_status(
    source: Arc<dyn StatusSource>,
    bus: EventBus,
    interval: Duration,
    stop: CancellationToken,
) {
    PollingStarted { interval }.log();
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let status = match source.fetch_status().await {
                    Ok(value) if !value.is_null() => Some(value),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::debug!(error = %e, "Status poll failed");
                        None
                    }
                };
                bus.emit(&ClientEvent::Status(status));
            }
        }
    }
    PollingStopped.log();
}
