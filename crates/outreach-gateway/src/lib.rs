// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for live chat.
//!
//! Each WebSocket connection becomes a [`ConnectionHandle`](outreach_chat::ConnectionHandle)
//! registered with the shared [`ChatEngine`](outreach_chat::ChatEngine). Text
//! frames are handed to the engine one at a time, in arrival order, and the
//! connection's outbound queue is drained to the socket by a sender task.

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{bind, router, serve, GatewayState};
