// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The sequencer and chat engine only talk to persistence, content
//! generation, and channel senders through these traits. All traits use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod campaign;
pub mod chat;
pub mod repository;

pub use campaign::{EnrollmentStore, TemplateCatalog, TouchDispatcher};
pub use chat::{LeadProcessor, Responder, ResponderContext, ResponderReply, SessionContext};
pub use repository::{
    CommunicationRepository, ConversationRepository, LeadRepository, NotificationRepository,
};
