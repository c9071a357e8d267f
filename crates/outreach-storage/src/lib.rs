// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Outreach engagement engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single
//! serialized connection via `tokio-rusqlite`, and implementations of every
//! repository trait in `outreach-core`, including the compare-and-set
//! enrollment store the sequencer depends on.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
