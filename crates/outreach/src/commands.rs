// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands.

use std::sync::Arc;

use outreach_config::OutreachConfig;
use outreach_core::types::{now, Enrollment};
use outreach_core::{LeadRepository, OutreachError};
use outreach_sequencer::TickReport;
use outreach_storage::SqliteStorage;
use tracing::warn;

use crate::serve::build_sequencer;

/// `outreach tick`: advance everything due right now, once.
pub async fn run_tick(config: &OutreachConfig) -> Result<TickReport, OutreachError> {
    let storage = Arc::new(SqliteStorage::open(&config.storage).await?);
    let report = build_sequencer(config, storage.clone()).tick(now()).await;
    storage.close().await?;
    report
}

/// `outreach enroll <lead> <campaign>`.
pub async fn run_enroll(
    config: &OutreachConfig,
    lead_id: &str,
    campaign_id: &str,
) -> Result<Enrollment, OutreachError> {
    let storage = Arc::new(SqliteStorage::open(&config.storage).await?);
    if storage.find_by_id(lead_id).await?.is_none() {
        return Err(OutreachError::NotFound {
            entity: "lead",
            id: lead_id.to_string(),
        });
    }

    let sequencer = build_sequencer(config, storage.clone());
    let report = sequencer.validate_sequence(campaign_id).await?;
    if !report.is_contiguous() {
        warn!(
            campaign_id,
            gaps = ?report.gaps,
            "enrollments in this campaign will complete at the first gap"
        );
    }
    let enrollment = sequencer.enroll(lead_id, campaign_id, now()).await;
    storage.close().await?;
    enrollment
}

/// `outreach config`: the effective configuration as TOML.
pub fn render_config(config: &OutreachConfig) -> Result<String, OutreachError> {
    toml::to_string_pretty(config)
        .map_err(|e| OutreachError::Config(format!("failed to render configuration: {e}")))
}
