// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound half of a live client connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::protocol::ServerEvent;

/// A handle for pushing serialized frames to one connection's writer task.
///
/// Sends never wait: a full queue drops the frame and a closed queue (the
/// socket went away) discards it silently.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: String,
    tx: mpsc::Sender<Arc<String>>,
    dropped: AtomicU64,
}

impl ConnectionHandle {
    pub fn new(id: impl Into<String>, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id: id.into(),
            tx,
            dropped: AtomicU64::new(0),
        }
    }

    /// A handle with a fresh UUID and a queue of `capacity` frames.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self::new(uuid::Uuid::new_v4().to_string(), tx);
        (Arc::new(handle), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue an already serialized frame. Returns whether it was queued.
    pub fn send_raw(&self, frame: Arc<String>) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(conn_id = %self.id, dropped, "outbound queue full, frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn_id = %self.id, "connection closed, frame discarded");
                false
            }
        }
    }

    /// Serialize and queue an event.
    pub fn send(&self, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send_raw(Arc::new(json)),
            Err(e) => {
                warn!(
                    conn_id = %self.id,
                    kind = event.kind(),
                    error = %e,
                    "failed to serialize event"
                );
                false
            }
        }
    }

    /// Frames dropped because the queue was full.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
