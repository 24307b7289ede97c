//! Broadcast set
//!
//! Sinks of every active session, used for fan-out of join, message and
//! departure lines. Fan-out snapshots the membership under the lock and
//! sends after releasing it, so a join or leave racing with a broadcast
//! can only change who receives that one line, never corrupt the set.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::message::ServerMessage;
use crate::types::SessionId;

/// Active sessions' sinks keyed by session, cheap to clone and share
#[derive(Debug, Clone, Default)]
pub struct BroadcastSet {
    members: Arc<Mutex<HashMap<SessionId, mpsc::Sender<ServerMessage>>>>,
}

impl BroadcastSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll a session's sink; false if it was already a member
    pub fn insert(&self, id: SessionId, sink: mpsc::Sender<ServerMessage>) -> bool {
        self.members.lock().insert(id, sink).is_none()
    }

    /// Remove a session's sink; a no-op if absent
    pub fn remove(&self, id: SessionId) -> bool {
        self.members.lock().remove(&id).is_some()
    }

    /// Number of enrolled sinks
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Check if no sinks are enrolled
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Send `msg` to every member
    ///
    /// Returns the number of sinks that accepted the line.
    pub async fn broadcast(&self, msg: ServerMessage) -> usize {
        self.fan_out(msg, None).await
    }

    /// Send `msg` to every member except `skip`
    pub async fn broadcast_except(&self, msg: ServerMessage, skip: SessionId) -> usize {
        self.fan_out(msg, Some(skip)).await
    }

    async fn fan_out(&self, msg: ServerMessage, skip: Option<SessionId>) -> usize {
        let targets: Vec<(SessionId, mpsc::Sender<ServerMessage>)> = self
            .members
            .lock()
            .iter()
            .filter(|(id, _)| Some(**id) != skip)
            .map(|(id, sink)| (*id, sink.clone()))
            .collect();

        let mut delivered = 0;
        for (id, sink) in targets {
            // A dead peer is cleaned up by its own session; keep going
            if sink.send(msg.clone()).await.is_err() {
                debug!("Broadcast to {} failed: sink closed", id);
                continue;
            }
            delivered += 1;
        }
        delivered
    }
}
