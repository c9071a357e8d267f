// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Out-of-band delivery to identified observers.
//!
//! Maps `userId` to the connection that authenticated as that user. Agent
//! updates, lead updates, handover requests and session-ended notices are
//! fanned out through here.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::connection::ConnectionHandle;
use crate::protocol::ServerEvent;

#[derive(Debug, Default)]
pub struct NotificationRelay {
    observers: DashMap<String, Arc<ConnectionHandle>>,
}

impl NotificationRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` for `user_id`, replacing any earlier connection.
    pub fn register(&self, user_id: &str, connection: Arc<ConnectionHandle>) {
        let conn_id = connection.id().to_string();
        let previous = self.observers.insert(user_id.to_string(), connection);
        match previous {
            Some(previous) if previous.id() != conn_id => {
                debug!(user_id, replaced = %previous.id(), conn_id = %conn_id, "observer replaced");
            }
            Some(_) => {}
            None => debug!(user_id, conn_id = %conn_id, "observer registered"),
        }
    }

    /// Remove `user_id` if it is still bound to `connection_id`.
    ///
    /// Unknown users, and users that re-registered from another connection,
    /// are left alone.
    pub fn unregister(&self, user_id: &str, connection_id: &str) -> bool {
        self.observers
            .remove_if(user_id, |_, conn| conn.id() == connection_id)
            .is_some()
    }

    pub fn is_registered(&self, user_id: &str) -> bool {
        self.observers.contains_key(user_id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver to one user. Returns whether the frame was queued.
    pub fn send_to(&self, user_id: &str, event: &ServerEvent) -> bool {
        let Some(conn) = self.observers.get(user_id).map(|c| Arc::clone(c.value())) else {
            return false;
        };
        conn.send(event)
    }

    /// Deliver to every observer; returns how many accepted the frame.
    ///
    /// A slow or closed observer never blocks the others.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(kind = event.kind(), error = %e, "failed to serialize event");
                return 0;
            }
        };

        // Snapshot first so no map shard lock is held while sending.
        let targets: Vec<(String, Arc<ConnectionHandle>)> = self
            .observers
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut delivered = 0;
        for (user_id, conn) in &targets {
            if conn.send_raw(Arc::clone(&json)) {
                delivered += 1;
            } else {
                warn!(
                    user_id = %user_id,
                    conn_id = %conn.id(),
                    kind = event.kind(),
                    "failed to deliver event"
                );
            }
        }
        debug!(kind = event.kind(), recipients = targets.len(), delivered, "broadcast event");
        delivered
    }
}
