// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign sequencer for the Outreach engagement engine.
//!
//! [`CampaignSequencer::tick`] advances every due enrollment by exactly one
//! touch. Each enrollment is claimed with a compare-and-set lease before its
//! touch is dispatched, so several sequencer processes can share one store
//! without sending the same step twice.

pub mod dispatcher;
pub mod runner;
pub mod sequencer;

pub use dispatcher::CommunicationDispatcher;
pub use runner::run_sequencer;
pub use sequencer::{CampaignSequencer, SequenceReport, StepOutcome, TickReport};
