// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Outreach engagement engine.

use thiserror::Error;

/// The primary error type used across all collaborator traits and core operations.
#[derive(Debug, Error)]
pub enum OutreachError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors on a live connection (bind failure, socket closed).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The chat responder failed to produce content.
    #[error("responder error: {message}")]
    Responder {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A campaign touch could not be handed to its channel sender.
    #[error("dispatch error: {message}")]
    Dispatch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniquely keyed entity already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A chat operation was attempted in the wrong session state.
    #[error("session error: {0}")]
    Session(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OutreachError {
    /// Short machine-readable code, used in wire `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            OutreachError::Config(_) => "config",
            OutreachError::Storage { .. } => "storage",
            OutreachError::Channel { .. } => "channel",
            OutreachError::Responder { .. } => "responder_failed",
            OutreachError::Dispatch { .. } => "dispatch_failed",
            OutreachError::NotFound { .. } => "not_found",
            OutreachError::Conflict(_) => "conflict",
            OutreachError::Session(_) => "session",
            OutreachError::Internal(_) => "internal",
        }
    }
}
