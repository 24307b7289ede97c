//! Client handle definition
//!
//! The shareable view of one registered session: who it is and how to send
//! lines to it. Cloned into the registry and handed out by lookups.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::SessionId;

/// Registered client information
///
/// The name is fixed at construction; a session builds its `Client` only
/// once it has a candidate name, so there is no "unnamed" handle.
#[derive(Debug, Clone)]
pub struct Client {
    /// Owning session
    pub id: SessionId,
    /// Screen name
    pub name: String,
    /// Self-reported address from the registration line
    pub address: String,
    /// Server → Client line sink
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a client handle for a session
    pub fn new(
        id: SessionId,
        name: impl Into<String>,
        address: impl Into<String>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address: address.into(),
            sender,
        }
    }

    /// Send a line to this client
    ///
    /// Waits for room in the client's outbound queue. Returns an error if
    /// the client's writer has gone away.
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}
