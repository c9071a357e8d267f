// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `outreach serve` command implementation.
//!
//! Opens storage, starts the campaign sequencer loop, and serves the chat
//! gateway until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use outreach_chat::{ChatEngine, ChatRepositories, NotificationRelay, ScriptedResponder};
use outreach_config::OutreachConfig;
use outreach_core::OutreachError;
use outreach_gateway::GatewayState;
use outreach_sequencer::{run_sequencer, CampaignSequencer, CommunicationDispatcher};
use outreach_storage::SqliteStorage;
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `outreach serve` command.
pub async fn run_serve(config: OutreachConfig) -> Result<(), OutreachError> {
    info!("starting outreach serve");

    let storage = Arc::new(SqliteStorage::open(&config.storage).await?);
    let cancel = shutdown::install_signal_handler();

    // Bind before spawning anything so a taken port fails fast.
    let listener = outreach_gateway::bind(&config.server.host, config.server.port).await?;

    let sequencer_task = if config.sequencer.enabled {
        let sequencer = Arc::new(build_sequencer(&config, storage.clone()));
        let interval = Duration::from_secs(config.sequencer.interval_secs);
        info!(
            interval_secs = config.sequencer.interval_secs,
            claim_timeout_secs = config.sequencer.claim_timeout_secs,
            max_attempts = config.sequencer.max_attempts,
            "campaign sequencer enabled"
        );
        Some(tokio::spawn(run_sequencer(
            sequencer,
            interval,
            cancel.clone(),
        )))
    } else {
        info!("campaign sequencer disabled");
        None
    };

    let engine = Arc::new(build_engine(&config, storage.clone()));
    let state = GatewayState::new(engine, config.chat.outbound_buffer);
    let served = outreach_gateway::serve(listener, state, cancel.clone()).await;

    // A gateway failure also stops the sequencer.
    cancel.cancel();
    if let Some(task) = sequencer_task {
        if let Err(e) = task.await {
            warn!(error = %e, "sequencer task ended abnormally");
        }
    }
    if let Err(e) = storage.close().await {
        warn!(error = %e, "failed to checkpoint database on shutdown");
    }

    served?;
    info!("outreach serve shutdown complete");
    Ok(())
}

/// A sequencer over SQLite that records touches in the communication log.
pub fn build_sequencer(config: &OutreachConfig, storage: Arc<SqliteStorage>) -> CampaignSequencer {
    CampaignSequencer::new(
        &config.sequencer,
        storage.clone(),
        storage.clone(),
        Arc::new(CommunicationDispatcher::new(storage)),
    )
}

/// A chat engine over SQLite with the keyword responder.
pub fn build_engine(config: &OutreachConfig, storage: Arc<SqliteStorage>) -> ChatEngine {
    let repos = ChatRepositories {
        leads: storage.clone(),
        conversations: storage.clone(),
        communications: storage.clone(),
        notifications: storage,
    };
    ChatEngine::new(
        config.chat.clone(),
        repos,
        Arc::new(ScriptedResponder::new(&config.chat.handover_keywords)),
        Arc::new(NotificationRelay::new()),
    )
}
