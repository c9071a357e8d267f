// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-interval driver for the sequencer.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::sequencer::CampaignSequencer;

/// Tick every `interval` until `cancel` fires.
///
/// Cancellation is only observed between ticks, so a tick in progress always
/// runs to completion. Ticks that fall behind are skipped rather than
/// replayed in a burst.
pub async fn run_sequencer(
    sequencer: Arc<CampaignSequencer>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_secs = interval.as_secs(), "campaign sequencer started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("campaign sequencer shutting down");
                break;
            }
            _ = ticker.tick() => {
                match sequencer.tick(chrono::Utc::now()).await {
                    Ok(report) if report.skipped => debug!("tick skipped, previous still running"),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "sequencer tick failed (non-fatal)"),
                }
            }
        }
    }
}
