// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Outreach integration tests.
//!
//! Provides mock collaborators and harnesses backed by a temporary SQLite
//! database, for fast deterministic tests without external services.
//!
//! # Components
//!
//! - [`TempStorage`] - Migrated SQLite storage in a temp directory
//! - [`MockResponder`] - Responder with queued replies and failure injection
//! - [`MockDispatcher`] - Touch dispatcher that records every dispatch
//! - [`MockLeadProcessor`] - Lead processor returning a fixed summary
//! - [`ChatHarness`] - Chat engine wired to the above, with in-process clients

pub mod harness;
pub mod mock_dispatcher;
pub mod mock_responder;
pub mod storage;

pub use harness::{ChatHarness, ChatHarnessBuilder, TestClient};
pub use mock_dispatcher::{DispatchRecord, MockDispatcher};
pub use mock_responder::{MockLeadProcessor, MockResponder};
pub use storage::{fixed_now, TempStorage};
