// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Outreach engagement engine.
//!
//! This crate provides the error type, the domain types, and the narrow
//! collaborator traits through which the campaign sequencer and the chat
//! engine reach persistence, content generation, and channel senders.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::OutreachError;
pub use types::{
    Channel, CommunicationRecord, Conversation, Direction, Enrollment, EnrollmentKey,
    EnrollmentStatus, Lead, MessageRole, NewCommunication, NewLead, StepUpdate, TouchTemplate,
};

pub use traits::{
    CommunicationRepository, ConversationRepository, EnrollmentStore, LeadProcessor,
    LeadRepository, NotificationRepository, Responder, TemplateCatalog, TouchDispatcher,
};
