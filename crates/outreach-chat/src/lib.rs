// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live chat for the Outreach engagement engine.
//!
//! This crate holds the per-connection session state machine, the turn
//! processor that persists each exchange and calls the responder, and the
//! relay that fans dashboard events out to identified connections. It is
//! transport-agnostic: the gateway feeds it text frames and drains each
//! connection's outbound queue.

pub mod connection;
pub mod engine;
pub mod protocol;
pub mod relay;
pub mod responder;
pub mod session;

pub use connection::ConnectionHandle;
pub use engine::{ChatEngine, ChatRepositories};
pub use protocol::{ClientMessage, ServerEvent};
pub use relay::NotificationRelay;
pub use responder::ScriptedResponder;
pub use session::{ActiveBinding, ChatSession, SessionRegistry, SessionState};
