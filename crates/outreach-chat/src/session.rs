// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection session state and the registry that holds it.

use std::sync::Arc;

use dashmap::DashMap;
use outreach_core::traits::SessionContext;

use crate::connection::ConnectionHandle;

/// The lead and conversation a session is bound to after `chat:init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveBinding {
    pub session_id: String,
    pub lead_id: String,
    pub conversation_id: String,
}

/// Where a connection is in its lifecycle.
///
/// ```text
/// Unauthenticated --auth--> Identified
/// Unauthenticated | Identified --chat:init--> Active
/// Active --chat:message--> Active
/// any --close--> Closed
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Identified {
        user_id: String,
    },
    Active {
        binding: ActiveBinding,
        user_id: Option<String>,
    },
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "unauthenticated"),
            SessionState::Identified { .. } => write!(f, "identified"),
            SessionState::Active { .. } => write!(f, "active"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

impl SessionState {
    /// The authenticated user, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionState::Identified { user_id } => Some(user_id),
            SessionState::Active { user_id, .. } => user_id.as_deref(),
            SessionState::Unauthenticated | SessionState::Closed => None,
        }
    }

    pub fn binding(&self) -> Option<&ActiveBinding> {
        match self {
            SessionState::Active { binding, .. } => Some(binding),
            _ => None,
        }
    }

    /// State after `auth{user_id}`. An active session keeps its binding.
    pub fn identify(self, user_id: String) -> Self {
        match self {
            SessionState::Unauthenticated | SessionState::Identified { .. } => {
                SessionState::Identified { user_id }
            }
            SessionState::Active { binding, .. } => SessionState::Active {
                binding,
                user_id: Some(user_id),
            },
            SessionState::Closed => SessionState::Closed,
        }
    }

    /// State after a successful `chat:init`. Re-initialising rebinds.
    pub fn activate(self, binding: ActiveBinding) -> Self {
        match self {
            SessionState::Closed => SessionState::Closed,
            other => SessionState::Active {
                user_id: other.user_id().map(str::to_string),
                binding,
            },
        }
    }
}

/// A live connection and its state.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub connection: Arc<ConnectionHandle>,
    pub state: SessionState,
}

impl ChatSession {
    pub fn context(&self) -> Option<SessionContext> {
        self.state.binding().map(|binding| SessionContext {
            connection_id: self.connection.id().to_string(),
            session_id: binding.session_id.clone(),
            user_id: self.state.user_id().map(str::to_string),
        })
    }
}

/// Live sessions keyed by connection id.
///
/// Entries are read by value and written back whole; callers never hold a
/// map guard across an `.await`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, ChatSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection in the `Unauthenticated` state.
    pub fn open(&self, connection: Arc<ConnectionHandle>) {
        let id = connection.id().to_string();
        self.sessions.insert(
            id,
            ChatSession {
                connection,
                state: SessionState::Unauthenticated,
            },
        );
    }

    pub fn get(&self, connection_id: &str) -> Option<ChatSession> {
        self.sessions.get(connection_id).map(|s| s.value().clone())
    }

    pub fn state(&self, connection_id: &str) -> SessionState {
        self.sessions
            .get(connection_id)
            .map(|s| s.state.clone())
            .unwrap_or(SessionState::Closed)
    }

    /// Apply a transition. Unknown connections are ignored.
    pub fn update(
        &self,
        connection_id: &str,
        transition: impl FnOnce(SessionState) -> SessionState,
    ) {
        if let Some(mut session) = self.sessions.get_mut(connection_id) {
            let current = std::mem::replace(&mut session.state, SessionState::Closed);
            session.state = transition(current);
        }
    }

    /// Drop a connection, returning its final session.
    pub fn close(&self, connection_id: &str) -> Option<ChatSession> {
        self.sessions.remove(connection_id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions bound to a lead.
    pub fn active_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.state.binding().is_some())
            .count()
    }
}
